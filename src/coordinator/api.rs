// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Caller-facing reads and writes.
//!
//! - `get()` / `set()` / `delete()` / `invalidate()` - local cache only
//! - `hybrid_get()` - remote first, then cache, then the caller's default
//! - `hybrid_set()` - remote first, else cache + enqueue for replay
//!
//! None of these return an error. Failures are logged and absorbed into a
//! fallback, so a flaky network or a full disk never reaches the UI.

use std::future::Future;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, instrument, warn};

use crate::cache::CacheTier;
use crate::queue::QueueItem;
use crate::remote::RemoteError;
use crate::resilience::best_effort::best_effort;

use super::{HybridSync, WriteOutcome};

impl HybridSync {
    // ═══════════════════════════════════════════════════════════════════════════
    // API: Local cache access
    // ═══════════════════════════════════════════════════════════════════════════

    /// Read `key` from the cache tiers.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.cache.get(key).await
    }

    /// Write `value` into the cache at `tier`. Never fails; a durable-tier
    /// error is logged.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, tier: CacheTier) {
        best_effort("cache_set", self.cache.set(key, value, tier)).await;
    }

    /// Remove `key` from both cache tiers.
    pub async fn delete(&self, key: &str) {
        best_effort("cache_delete", self.cache.delete(key)).await;
    }

    /// Remove every cached key starting with `prefix`. Returns how many went.
    pub async fn invalidate(&self, prefix: &str) -> usize {
        best_effort("cache_invalidate", self.cache.invalidate(prefix))
            .await
            .unwrap_or(0)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // API: Remote-first access
    // ═══════════════════════════════════════════════════════════════════════════

    /// Remote-first read.
    ///
    /// On success the value is written through to the cache (best effort) and
    /// returned. On any remote error the newest pending write for the key is
    /// returned, then the cached copy, then `fallback`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use hybrid_sync::{HybridSync, UserSettings};
    /// # use hybrid_sync::remote::RemoteError;
    /// # async fn example(sync: &HybridSync) {
    /// let settings = sync
    ///     .hybrid_get(
    ///         || async { Err::<UserSettings, _>(RemoteError::Timeout) },
    ///         "settings",
    ///         UserSettings::default(),
    ///     )
    ///     .await;
    /// # }
    /// ```
    #[instrument(skip(self, remote_fetch, fallback), fields(source))]
    pub async fn hybrid_get<T, F, Fut>(&self, remote_fetch: F, cache_key: &str, fallback: T) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let remote_result = {
            let _timer = crate::metrics::LatencyTimer::new("remote", "fetch");
            remote_fetch().await
        };

        match remote_result {
            Ok(value) => {
                self.connectivity.record_success();
                crate::metrics::record_operation("remote", "fetch", "success");
                tracing::Span::current().record("source", "remote");
                best_effort("cache_write_through", self.cache.set(cache_key, &value, CacheTier::Warm)).await;
                value
            }
            Err(e) => {
                self.connectivity.record_failure();
                crate::metrics::record_operation("remote", "fetch", "error");
                debug!(key = cache_key, error = %e, "Remote fetch failed, reading from cache");

                // An unsynced write is newer than anything cached and has no TTL
                if let Some(pending) = self.queue.latest(cache_key) {
                    match serde_json::from_value::<T>(pending) {
                        Ok(value) => {
                            tracing::Span::current().record("source", "queue");
                            return value;
                        }
                        Err(e) => warn!(key = cache_key, error = %e, "Pending write does not decode, ignoring it"),
                    }
                }

                match self.cache.get::<T>(cache_key).await {
                    Some(cached) => {
                        tracing::Span::current().record("source", "cache");
                        cached
                    }
                    None => {
                        tracing::Span::current().record("source", "fallback");
                        debug!(key = cache_key, "No cached copy, using fallback");
                        fallback
                    }
                }
            }
        }
    }

    /// Remote-first write.
    ///
    /// On success the cache is refreshed. On any remote error the value is
    /// still cached (so local reads see it) and a queue item with zero
    /// attempts is appended for the next background sync.
    #[instrument(skip(self, remote_save, data))]
    pub async fn hybrid_set<T, F, Fut>(&self, remote_save: F, cache_key: &str, data: T) -> WriteOutcome
    where
        T: Serialize,
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<(), RemoteError>>,
    {
        // Snapshot before the payload is moved into the remote call
        let snapshot = match serde_json::to_value(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = cache_key, error = %e, "Payload does not serialize, cannot cache or queue it");
                None
            }
        };

        let remote_result = {
            let _timer = crate::metrics::LatencyTimer::new("remote", "save");
            remote_save(data).await
        };

        match remote_result {
            Ok(()) => {
                self.connectivity.record_success();
                crate::metrics::record_operation("remote", "save", "success");
                if let Some(value) = snapshot {
                    best_effort("cache_refresh", self.cache.set_value(cache_key, value, CacheTier::Hot)).await;
                }
                WriteOutcome::Synced
            }
            Err(e) => {
                self.connectivity.record_failure();
                crate::metrics::record_operation("remote", "save", "error");

                let Some(value) = snapshot else {
                    error!(key = cache_key, error = %e, "Remote save failed and payload is unserializable, write lost");
                    return WriteOutcome::Failed;
                };
                debug!(key = cache_key, error = %e, "Remote save failed, caching and queueing");

                best_effort("cache_offline_write", self.cache.set_value(cache_key, value.clone(), CacheTier::Hot)).await;

                let item = QueueItem::new(cache_key, value, self.clock.now_ms());
                best_effort("queue_persist", self.queue.enqueue(item)).await;

                if self.config.signal_sync_on_write_failure {
                    self.sync_trigger.notify_one();
                }
                WriteOutcome::Queued
            }
        }
    }
}
