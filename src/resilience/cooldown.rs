// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Time-boxed bypass for a backend that reported itself unusable.
//!
//! Simpler than a circuit breaker: one trip benches the backend for a fixed
//! window, and it is tried again as soon as the window ends.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::clock::Clock;

pub struct Cooldown {
    name: &'static str,
    window_ms: u64,
    /// Epoch millis until which the backend is benched (0 = never tripped)
    benched_until_ms: AtomicU64,
    trips: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl Cooldown {
    pub fn new(name: &'static str, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            window_ms: window.as_millis() as u64,
            benched_until_ms: AtomicU64::new(0),
            trips: AtomicU64::new(0),
            clock,
        }
    }

    /// Bench the backend for one window starting now.
    pub fn trip(&self, reason: &str) {
        let until = self.clock.now_ms().saturating_add(self.window_ms);
        self.benched_until_ms.store(until, Ordering::Release);
        self.trips.fetch_add(1, Ordering::Relaxed);
        warn!(backend = self.name, reason, window_ms = self.window_ms, "Backend benched");
        crate::metrics::set_backend_healthy(self.name, false);
    }

    /// Whether the backend may be used right now.
    pub fn is_available(&self) -> bool {
        let until = self.benched_until_ms.load(Ordering::Acquire);
        if until == 0 {
            return true;
        }
        if self.clock.now_ms() < until {
            return false;
        }
        // Window over; clear once so the recovery is logged a single time
        if self
            .benched_until_ms
            .compare_exchange(until, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!(backend = self.name, "Backend cooldown elapsed, resuming");
            crate::metrics::set_backend_healthy(self.name, true);
        }
        true
    }

    /// Number of times the backend was benched.
    pub fn trips(&self) -> u64 {
        self.trips.load(Ordering::Relaxed)
    }
}
