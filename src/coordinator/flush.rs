// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Queue replay.
//!
//! `background_sync()` drains the pending queue against the replay handlers
//! registered per storage key. At most one drain runs at a time.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::queue::{DeadLetter, DeadLetterReason, QueueItem};
use crate::remote::{RemoteError, ReplayError};
use crate::resilience::best_effort::best_effort;

use super::{ConnectivityProbe, HybridSync, ReplayHandler, SyncReport};

/// Clears the single-flight flag however the drain exits.
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl HybridSync {
    /// Register the remote save used to replay queued writes for `key`.
    ///
    /// Queued payloads are decoded as `T` before `save` is called. Registering
    /// the same key twice replaces the earlier handler.
    pub fn register_domain<T, F, Fut>(&self, key: impl Into<String>, save: F)
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RemoteError>> + Send + 'static,
    {
        let handler: ReplayHandler = Arc::new(move |payload: Value| match serde_json::from_value::<T>(payload) {
            Ok(data) => save(data).map(|r| r.map_err(ReplayError::from)).boxed(),
            Err(e) => futures::future::ready(Err(ReplayError::Decode(e))).boxed(),
        });

        let key = key.into();
        debug!(key = %key, "Registered replay handler");
        self.handlers.write().insert(key, handler);
    }

    /// Whether a replay handler exists for `key`.
    #[must_use]
    pub fn has_handler(&self, key: &str) -> bool {
        self.handlers.read().contains_key(key)
    }

    /// Set the cheap remote call run before each drain. Without one, every
    /// drain assumes the remote is reachable.
    pub fn set_connectivity_probe<F, Fut>(&self, probe: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RemoteError>> + Send + 'static,
    {
        let probe: ConnectivityProbe = Arc::new(move || probe().boxed());
        *self.probe.write() = Some(probe);
    }

    /// Replay the pending queue, oldest first.
    ///
    /// - A second call while one is running returns an empty report at once.
    /// - An empty queue returns an empty report without touching anything.
    /// - A failing probe marks the engine offline and returns an empty report.
    ///
    /// Per item: success drops it; a remote failure bumps `attempts` and keeps
    /// it in place until `max_sync_attempts` is reached, then it moves to the
    /// dead-letter record; an unknown key or undecodable payload goes to the
    /// dead-letter record straight away. The queue is persisted once at the end.
    #[instrument(skip(self))]
    pub async fn background_sync(&self) -> SyncReport {
        if self.syncing.swap(true, Ordering::AcqRel) {
            debug!("Background sync already in flight, skipping");
            return SyncReport::default();
        }
        let _guard = SyncGuard(&self.syncing);

        if self.queue.is_empty() {
            return SyncReport::default();
        }

        let probe = self.probe.read().clone();
        if let Some(probe) = probe {
            if let Err(e) = probe().await {
                self.connectivity.record_failure();
                debug!(error = %e, "Connectivity probe failed, sync postponed");
                return SyncReport::default();
            }
            self.connectivity.record_success();
        }

        let snapshot = self.queue.begin_drain();
        let handlers = self.handlers.read().clone();
        let max_attempts = self.config.max_sync_attempts;

        let mut report = SyncReport::default();
        let mut retained: Vec<QueueItem> = Vec::with_capacity(snapshot.items.len());
        let mut letters: Vec<DeadLetter> = Vec::new();

        info!(pending = snapshot.items.len(), "Draining sync queue");

        for mut item in snapshot.items.iter().cloned() {
            let Some(handler) = handlers.get(&item.key) else {
                warn!(key = %item.key, "No replay handler for queued key, skipping");
                report.skipped += 1;
                letters.push(self.dead_letter(item, DeadLetterReason::UnknownDomain));
                continue;
            };

            let _timer = crate::metrics::LatencyTimer::new("remote", "replay");
            match handler(item.data.clone()).await {
                Ok(()) => {
                    self.connectivity.record_success();
                    crate::metrics::record_operation("remote", "replay", "success");
                    debug!(key = %item.key, attempts = item.attempts, "Queued write replayed");
                    report.synced += 1;
                }
                Err(ReplayError::Decode(e)) => {
                    crate::metrics::record_operation("remote", "replay", "error");
                    report.failed += 1;
                    report.dropped += 1;
                    let reason = DeadLetterReason::Undecodable { detail: e.to_string() };
                    letters.push(self.dead_letter(item, reason));
                }
                Err(ReplayError::Remote(e)) => {
                    self.connectivity.record_failure();
                    crate::metrics::record_operation("remote", "replay", "error");
                    report.failed += 1;
                    item.attempts = item.attempts.saturating_add(1);

                    if item.attempts >= max_attempts {
                        report.dropped += 1;
                        letters.push(self.dead_letter(item, DeadLetterReason::RetriesExhausted));
                    } else {
                        debug!(key = %item.key, attempts = item.attempts, error = %e, "Replay failed, keeping in queue");
                        retained.push(item);
                    }
                }
            }
        }

        self.queue.settle(snapshot, retained);
        best_effort("queue_persist", self.queue.persist()).await;
        best_effort("dead_letter_persist", self.dead_letters.record(letters)).await;

        crate::metrics::record_sync_cycle(report.synced, report.failed, report.dropped);
        info!(
            synced = report.synced,
            failed = report.failed,
            dropped = report.dropped,
            skipped = report.skipped,
            remaining = self.queue.len(),
            "Sync cycle complete"
        );
        report
    }

    fn dead_letter(&self, item: QueueItem, reason: DeadLetterReason) -> DeadLetter {
        DeadLetter {
            item,
            reason,
            dropped_at: self.clock.now_ms(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Dead letters
    // ═══════════════════════════════════════════════════════════════════════════

    /// Writes that were given up on, oldest first.
    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.list()
    }

    pub async fn clear_dead_letters(&self) {
        best_effort("dead_letter_clear", self.dead_letters.clear()).await;
    }
}
