// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Public types for the hybrid sync coordinator.

use serde::Serialize;

/// What happened to a write handed to [`super::HybridSync::hybrid_set()`].
///
/// Neither variant is an error. `Queued` means the value is readable
/// locally and will be replayed by the next background sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The remote store accepted the write
    Synced,
    /// The remote store was unreachable; cached and queued for replay
    Queued,
    /// The remote store was unreachable and the payload could not be
    /// serialized, so nothing was kept locally either
    Failed,
}

impl WriteOutcome {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Queued)
    }
}

impl std::fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Synced => write!(f, "Synced"),
            Self::Queued => write!(f, "Queued"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Result of one [`super::HybridSync::background_sync()`] cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Items the remote store accepted
    pub synced: usize,
    /// Items whose replay failed this cycle (kept or dropped)
    pub failed: usize,
    /// Items moved to the dead-letter record this cycle
    pub dropped: usize,
    /// Items with no registered replay handler
    pub skipped: usize,
}

impl SyncReport {
    /// Whether the cycle touched the queue at all.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Diagnostics snapshot for a status screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub is_online: bool,
    /// Entries resident in the memory tier
    pub cache_entry_count: usize,
    pub pending_queue_length: usize,
    pub dead_letter_count: usize,
    /// Estimated bytes held by the memory tier
    pub memory_bytes: usize,
    /// Whether a hot store is configured and not benched
    pub hot_store_available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_report_noop() {
        assert!(SyncReport::default().is_noop());
        assert!(!SyncReport { skipped: 1, ..Default::default() }.is_noop());
    }

    #[test]
    fn test_write_outcome_pending() {
        assert!(WriteOutcome::Queued.is_pending());
        assert!(!WriteOutcome::Synced.is_pending());
        assert_eq!(WriteOutcome::Queued.to_string(), "Queued");
    }

    #[test]
    fn test_storage_info_serializes_camel_case() {
        let info = StorageInfo {
            is_online: false,
            cache_entry_count: 2,
            pending_queue_length: 1,
            dead_letter_count: 0,
            memory_bytes: 64,
            hot_store_available: false,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["isOnline"], false);
        assert_eq!(json["pendingQueueLength"], 1);
    }
}
