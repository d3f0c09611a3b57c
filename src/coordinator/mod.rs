// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Hybrid sync coordinator.
//!
//! The [`HybridSync`] is the orchestrator every domain accessor goes
//! through. It owns all shared state for one user's data:
//! - the [`TieredCache`] (memory tier + durable tier)
//! - the [`SyncQueue`] of writes the remote store has not seen yet
//! - the dead-letter record for writes that were given up on
//! - the connectivity flag
//! - the replay handlers and the connectivity probe
//!
//! Nothing lives in module-level globals, so tests build as many
//! independent instances as they like.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hybrid_sync::{HybridSync, HybridSyncConfig};
//! use hybrid_sync::storage::sqlite::SqliteStore;
//! use tokio::sync::watch;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let durable = SqliteStore::open("study.db").await?;
//! let sync = Arc::new(
//!     HybridSync::builder(HybridSyncConfig::default())
//!         .durable(Arc::new(durable))
//!         .build()
//!         .await,
//! );
//!
//! let (stop_tx, stop_rx) = watch::channel(false);
//! let runner = sync.clone();
//! let handle = tokio::spawn(async move { runner.run(stop_rx).await });
//!
//! // ... app runs ...
//!
//! stop_tx.send(true)?;
//! handle.await?;
//! # Ok(())
//! # }
//! ```

mod types;
mod api;
mod flush;
mod lifecycle;

pub use types::{StorageInfo, SyncReport, WriteOutcome};

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::Notify;
use tracing::info;

use crate::cache::TieredCache;
use crate::clock::{Clock, SystemClock};
use crate::config::HybridSyncConfig;
use crate::queue::{DeadLetterStore, QueueItem, SyncQueue};
use crate::remote::{RemoteError, ReplayError};
use crate::resilience::connectivity::Connectivity;
use crate::storage::fallback::FallbackStore;
use crate::storage::memory::InMemoryStore;
use crate::storage::traits::KvStore;

/// Replays one queued payload against the remote store.
pub(crate) type ReplayHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<(), ReplayError>> + Send + Sync>;

/// Cheap remote call used to decide whether a sync cycle is worth running.
pub(crate) type ConnectivityProbe = Arc<dyn Fn() -> BoxFuture<'static, Result<(), RemoteError>> + Send + Sync>;

/// Remote-first storage orchestrator.
///
/// # Thread Safety
///
/// `Send + Sync`; share it behind an `Arc`. Synchronous state (memory tier,
/// queue contents, handler table) sits behind `parking_lot` locks that are
/// never held across an `.await`.
pub struct HybridSync {
    pub(super) config: HybridSyncConfig,

    /// Memory + durable cache tiers
    pub(super) cache: TieredCache,

    /// Hot/durable store shared by cache, queue and dead letters
    pub(super) store: Arc<FallbackStore>,

    /// Writes waiting for the remote store
    pub(super) queue: SyncQueue,

    /// Writes that were given up on
    pub(super) dead_letters: DeadLetterStore,

    /// Outcome of the most recent remote call
    pub(super) connectivity: Connectivity,

    /// Storage key → replay handler
    pub(super) handlers: RwLock<HashMap<String, ReplayHandler>>,

    pub(super) probe: RwLock<Option<ConnectivityProbe>>,

    /// Single-flight flag for `background_sync`
    pub(super) syncing: AtomicBool,

    /// Signalled after a failed remote write; consumed by `run()`
    pub(super) sync_trigger: Notify,

    pub(super) clock: Arc<dyn Clock>,
}

impl HybridSync {
    /// Start building an orchestrator.
    pub fn builder(config: HybridSyncConfig) -> HybridSyncBuilder {
        HybridSyncBuilder::new(config)
    }

    #[must_use]
    pub fn config(&self) -> &HybridSyncConfig {
        &self.config
    }

    /// The cache tiers, for callers that need tier control.
    #[must_use]
    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    /// Last known remote reachability.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    #[must_use]
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Copy of the pending queue, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<QueueItem> {
        self.queue.items()
    }

    #[must_use]
    pub fn storage_info(&self) -> StorageInfo {
        StorageInfo {
            is_online: self.connectivity.is_online(),
            cache_entry_count: self.cache.len(),
            pending_queue_length: self.queue.len(),
            dead_letter_count: self.dead_letters.len(),
            memory_bytes: self.cache.memory_bytes(),
            hot_store_available: self.store.hot_available(),
        }
    }
}

/// Builder for [`HybridSync`].
///
/// With no durable store an [`InMemoryStore`] is used, which is fine for
/// tests but loses the queue on restart.
pub struct HybridSyncBuilder {
    config: HybridSyncConfig,
    durable: Option<Arc<dyn KvStore>>,
    hot: Option<Arc<dyn KvStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl HybridSyncBuilder {
    pub fn new(config: HybridSyncConfig) -> Self {
        Self {
            config,
            durable: None,
            hot: None,
            clock: None,
        }
    }

    /// Persistent store backing the cache's durable tier and the queue.
    pub fn durable(mut self, store: Arc<dyn KvStore>) -> Self {
        self.durable = Some(store);
        self
    }

    /// Optional fast, capacity-limited store in front of the durable one.
    pub fn hot(mut self, store: Arc<dyn KvStore>) -> Self {
        self.hot = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Wire everything up and restore the persisted queue and dead letters.
    pub async fn build(self) -> HybridSync {
        let config = self.config;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let durable = self.durable.unwrap_or_else(|| {
            info!("No durable store configured, using in-memory store");
            Arc::new(InMemoryStore::new())
        });
        let has_hot = self.hot.is_some();

        let store = Arc::new(FallbackStore::new(
            self.hot,
            durable,
            config.hot_store_cooldown(),
            clock.clone(),
        ));

        let cache = TieredCache::new(&config, store.clone(), clock.clone());
        let queue = SyncQueue::load(store.clone(), config.queue_key.clone()).await;
        let dead_letters =
            DeadLetterStore::load(store.clone(), config.dead_letter_key.clone(), config.dead_letter_capacity).await;

        info!(
            hot_store = has_hot,
            memory_budget_bytes = config.memory_budget_bytes,
            pending = queue.len(),
            dead_letters = dead_letters.len(),
            "Hybrid sync ready"
        );
        crate::metrics::set_online(true);

        HybridSync {
            config,
            cache,
            store,
            queue,
            dead_letters,
            connectivity: Connectivity::new(),
            handlers: RwLock::new(HashMap::new()),
            probe: RwLock::new(None),
            syncing: AtomicBool::new(false),
            sync_trigger: Notify::new(),
            clock,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::clock::ManualClock;

    pub(crate) struct Harness {
        pub sync: HybridSync,
        pub durable: Arc<InMemoryStore>,
        pub clock: ManualClock,
    }

    pub(crate) async fn harness_with(config: HybridSyncConfig) -> Harness {
        let durable = Arc::new(InMemoryStore::new());
        let clock = ManualClock::at_ms(1_700_000_000_000);
        let sync = HybridSync::builder(config)
            .durable(durable.clone())
            .clock(Arc::new(clock.clone()))
            .build()
            .await;
        Harness { sync, durable, clock }
    }

    pub(crate) async fn harness() -> Harness {
        harness_with(HybridSyncConfig::default()).await
    }
}
