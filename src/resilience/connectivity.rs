// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Remote connectivity flag.
//!
//! The flag follows the outcome of the most recent remote call: one success
//! means online, one failure means offline. The counters exist for
//! diagnostics only and never gate anything.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::info;

pub struct Connectivity {
    online: AtomicBool,
    consecutive_failures: AtomicU64,
    transitions: AtomicU64,
}

impl Connectivity {
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true), // Assume online until a call says otherwise
            consecutive_failures: AtomicU64::new(0),
            transitions: AtomicU64::new(0),
        }
    }

    /// Record a successful remote call.
    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        if !self.online.swap(true, Ordering::AcqRel) {
            self.transitions.fetch_add(1, Ordering::Relaxed);
            info!("Remote reachable again, now online");
            crate::metrics::set_online(true);
        }
    }

    /// Record a failed remote call.
    pub fn record_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::AcqRel);
        if self.online.swap(false, Ordering::AcqRel) {
            self.transitions.fetch_add(1, Ordering::Relaxed);
            info!("Remote call failed, now offline");
            crate::metrics::set_online(false);
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Failures since the last success.
    pub fn failure_count(&self) -> u64 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    /// Number of online/offline flips since startup.
    pub fn transitions(&self) -> u64 {
        self.transitions.load(Ordering::Relaxed)
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}
