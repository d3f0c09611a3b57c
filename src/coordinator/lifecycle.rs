// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Maintenance loop, shutdown and local wipe.

use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::resilience::best_effort::best_effort;

use super::HybridSync;

impl HybridSync {
    /// Purge expired memory-tier entries. Returns how many were dropped.
    pub fn cleanup(&self) -> usize {
        self.cache.cleanup()
    }

    /// Run periodic sync and cleanup until `shutdown` flips to `true` (or
    /// its sender is dropped), then call [`shutdown()`](Self::shutdown).
    ///
    /// A failed remote write wakes the loop for an immediate sync when
    /// `signal_sync_on_write_failure` is set.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            sync_interval_secs = self.config.sync_interval_secs,
            cleanup_interval_secs = self.config.cleanup_interval_secs,
            "Hybrid sync maintenance loop running"
        );

        let mut sync_interval = tokio::time::interval(Duration::from_secs(self.config.sync_interval_secs.max(1)));
        let mut cleanup_interval = tokio::time::interval(Duration::from_secs(self.config.cleanup_interval_secs.max(1)));
        sync_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown sender dropped, stopping");
                        break;
                    }
                }

                _ = self.sync_trigger.notified() => {
                    debug!("Write failure signalled, syncing now");
                    self.background_sync().await;
                }

                _ = sync_interval.tick() => {
                    self.background_sync().await;
                }

                _ = cleanup_interval.tick() => {
                    self.cleanup();
                }
            }
        }

        self.shutdown().await;
    }

    /// Persist the queue and dead letters so a restart resumes from here.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let shutdown_start = std::time::Instant::now();
        info!(pending = self.queue.len(), "Initiating hybrid sync shutdown...");

        best_effort("queue_persist", self.queue.persist()).await;

        info!(elapsed_ms = shutdown_start.elapsed().as_millis() as u64, "Hybrid sync shutdown complete");
    }

    /// Wipe both cache tiers, the pending queue and the dead letters.
    ///
    /// Returns `false` if any part could not be removed from the durable
    /// store. In-memory state is cleared regardless.
    #[instrument(skip(self))]
    pub async fn clear_local(&self) -> bool {
        let cache = best_effort("clear_cache", self.cache.clear()).await;
        let queue = best_effort("clear_queue", self.queue.clear()).await;
        let letters = best_effort("clear_dead_letters", self.dead_letters.clear()).await;

        let ok = cache.is_some() && queue.is_some() && letters.is_some();
        info!(ok, "Local data cleared");
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::harness;
    use crate::cache::CacheTier;
    use crate::config::HybridSyncConfig;
    use crate::remote::RemoteError;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::watch;

    #[tokio::test]
    async fn test_cleanup_drops_expired_entries() {
        let h = harness().await;
        h.sync.set("a", &1, CacheTier::Hot).await;
        h.sync.set("b", &2, CacheTier::Warm).await;

        h.clock.advance_ms(HybridSyncConfig::default().hot_ttl_ms);
        assert_eq!(h.sync.cleanup(), 1);
        assert_eq!(h.sync.storage_info().cache_entry_count, 1);
    }

    #[tokio::test]
    async fn test_clear_local_wipes_everything() {
        let h = harness().await;
        h.sync.set("a", &1, CacheTier::Hot).await;
        h.sync
            .hybrid_set(|_: Value| async { Err(RemoteError::Timeout) }, "settings", json!({}))
            .await;

        assert!(h.sync.clear_local().await);

        let info = h.sync.storage_info();
        assert_eq!(info.cache_entry_count, 0);
        assert_eq!(info.pending_queue_length, 0);
        assert!(h.durable.is_empty());
    }

    #[tokio::test]
    async fn test_run_syncs_on_write_failure_and_stops() {
        let h = harness().await;
        let sync = Arc::new(h.sync);
        let replays = Arc::new(AtomicUsize::new(0));
        let counter = replays.clone();
        sync.register_domain("settings", move |_: Value| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });

        let (stop_tx, stop_rx) = watch::channel(false);
        let runner = sync.clone();
        let handle = tokio::spawn(async move { runner.run(stop_rx).await });

        sync.hybrid_set(|_: Value| async { Err(RemoteError::Timeout) }, "settings", json!({"theme": "dark"}))
            .await;

        for _ in 0..100 {
            if sync.pending().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(sync.pending().is_empty());
        assert_eq!(replays.load(Ordering::SeqCst), 1);

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_run_exits_when_sender_dropped() {
        let h = harness().await;
        let (stop_tx, stop_rx) = watch::channel(false);
        drop(stop_tx);
        h.sync.run(stop_rx).await;
    }
}
