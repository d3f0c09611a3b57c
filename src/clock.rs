// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Wall-clock abstraction.
//!
//! Cache TTLs and the hot-store cooldown are measured in epoch milliseconds
//! read through [`Clock`], so tests can move time forward with
//! [`ManualClock`] instead of sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Reads the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and pass
/// another to the engine.
///
/// ```
/// use hybrid_sync::{Clock, ManualClock};
///
/// let clock = ManualClock::at_ms(1_000);
/// let engine_handle = clock.clone();
/// clock.advance_ms(500);
/// assert_eq!(engine_handle.now_ms(), 1_500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    current_ms: Arc<AtomicU64>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn at_ms(start_ms: u64) -> Self {
        Self {
            current_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Advance time, returning the new current time.
    pub fn advance_ms(&self, ms: u64) -> u64 {
        self.current_ms.fetch_add(ms, Ordering::SeqCst).saturating_add(ms)
    }

    pub fn advance_secs(&self, secs: u64) -> u64 {
        self.advance_ms(secs.saturating_mul(1000))
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }
}
