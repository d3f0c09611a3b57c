// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Hot store in front of the durable store.
//!
//! ```text
//!   write ──► durable (always) ──► hot (while healthy)
//!   read  ──► hot (healthy, key not stale) ──► durable
//! ```
//!
//! A hot store that reports [`StorageError::CapacityExceeded`] is benched for
//! the configured cooldown and every operation goes straight to the durable
//! store. Keys written or removed while the hot copy could not be updated
//! are marked stale and never read back from the hot store until a later
//! write refreshes them there.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::traits::{KvStore, StorageError};
use crate::clock::Clock;
use crate::resilience::cooldown::Cooldown;

#[derive(Default)]
struct StaleHot {
    keys: HashSet<String>,
    prefixes: Vec<String>,
}

impl StaleHot {
    fn contains(&self, key: &str) -> bool {
        self.keys.contains(key) || self.prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }
}

pub struct FallbackStore {
    hot: Option<Arc<dyn KvStore>>,
    durable: Arc<dyn KvStore>,
    cooldown: Cooldown,
    stale: Mutex<StaleHot>,
}

impl FallbackStore {
    /// Durable store only.
    pub fn durable_only(durable: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self::new(None, durable, Duration::ZERO, clock)
    }

    pub fn new(
        hot: Option<Arc<dyn KvStore>>,
        durable: Arc<dyn KvStore>,
        cooldown: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            hot,
            durable,
            cooldown: Cooldown::new("hot", cooldown, clock),
            stale: Mutex::new(StaleHot::default()),
        }
    }

    /// Whether a hot store is configured and currently in use.
    pub fn hot_available(&self) -> bool {
        self.usable_hot().is_some()
    }

    /// Number of times the hot store was benched for capacity.
    pub fn hot_trips(&self) -> u64 {
        self.cooldown.trips()
    }

    fn usable_hot(&self) -> Option<&Arc<dyn KvStore>> {
        let hot = self.hot.as_ref()?;
        if !self.cooldown.is_available() {
            return None;
        }
        if !hot.is_healthy() {
            return None;
        }
        Some(hot)
    }

    fn on_hot_error(&self, operation: &str, key: &str, err: &StorageError) {
        crate::metrics::record_operation("hot", operation, "error");
        match err {
            StorageError::CapacityExceeded(detail) => self.cooldown.trip(detail),
            _ => warn!(operation, key, error = %err, "Hot store operation failed, using durable store"),
        }
    }

    fn mark_stale(&self, key: &str) {
        if self.hot.is_some() {
            self.stale.lock().keys.insert(key.to_string());
        }
    }
}

#[async_trait]
impl KvStore for FallbackStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if let Some(hot) = self.usable_hot() {
            if !self.stale.lock().contains(key) {
                match hot.get(key).await {
                    Ok(Some(value)) => {
                        crate::metrics::record_operation("hot", "get", "hit");
                        return Ok(Some(value));
                    }
                    Ok(None) => crate::metrics::record_operation("hot", "get", "miss"),
                    Err(e) => self.on_hot_error("get", key, &e),
                }
            }
        }
        self.durable.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.durable.set(key, value.clone()).await?;

        match self.usable_hot() {
            Some(hot) => match hot.set(key, value).await {
                Ok(()) => {
                    self.stale.lock().keys.remove(key);
                }
                Err(e) => {
                    self.on_hot_error("set", key, &e);
                    self.mark_stale(key);
                }
            },
            None => self.mark_stale(key),
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.durable.remove(key).await?;

        // Removal frees space, so it is attempted even while benched
        if let Some(hot) = self.hot.as_ref() {
            if let Err(e) = hot.remove(key).await {
                self.on_hot_error("remove", key, &e);
                self.mark_stale(key);
            }
        }
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, StorageError> {
        // Every key reaches the durable store first, so it holds the full set
        self.durable.list_keys().await
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        let removed = self.durable.remove_prefix(prefix).await?;

        if let Some(hot) = self.hot.as_ref() {
            match hot.remove_prefix(prefix).await {
                Ok(n) => debug!(prefix, removed = n, "Hot store prefix removed"),
                Err(e) => {
                    self.on_hot_error("remove_prefix", prefix, &e);
                    self.stale.lock().prefixes.push(prefix.to_string());
                }
            }
        }
        Ok(removed)
    }

    fn is_healthy(&self) -> bool {
        self.durable.is_healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::memory::InMemoryStore;

    struct Fixture {
        hot: Arc<InMemoryStore>,
        durable: Arc<InMemoryStore>,
        clock: ManualClock,
        store: FallbackStore,
    }

    fn fixture(hot_capacity: usize) -> Fixture {
        let hot = Arc::new(InMemoryStore::with_capacity_limit(hot_capacity));
        let durable = Arc::new(InMemoryStore::new());
        let clock = ManualClock::at_ms(10_000);
        let store = FallbackStore::new(
            Some(hot.clone() as Arc<dyn KvStore>),
            durable.clone(),
            Duration::from_secs(60),
            Arc::new(clock.clone()),
        );
        Fixture { hot, durable, clock, store }
    }

    #[tokio::test]
    async fn test_writes_reach_both_tiers() {
        let f = fixture(10);
        f.store.set("k", "v".into()).await.unwrap();

        assert_eq!(f.hot.raw("k").as_deref(), Some("v"));
        assert_eq!(f.durable.raw("k").as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_read_prefers_hot() {
        let f = fixture(10);
        f.store.set("k", "v".into()).await.unwrap();
        // Diverge the durable copy to see which tier answers
        f.durable.set("k", "durable".into()).await.unwrap();

        assert_eq!(f.store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_capacity_error_benches_hot_store() {
        let f = fixture(1);
        f.store.set("a", "1".into()).await.unwrap();
        assert!(f.store.hot_available());

        // Second key overflows the hot store
        f.store.set("b", "2".into()).await.unwrap();
        assert!(!f.store.hot_available());
        assert_eq!(f.store.hot_trips(), 1);

        // Still readable from the durable tier
        assert_eq!(f.store.get("b").await.unwrap().as_deref(), Some("2"));

        f.clock.advance_secs(61);
        assert!(f.store.hot_available());
    }

    #[tokio::test]
    async fn test_key_written_while_benched_is_not_read_from_hot() {
        let f = fixture(1);
        f.store.set("a", "old".into()).await.unwrap();
        f.store.set("b", "overflow".into()).await.unwrap(); // trips cooldown

        // Hot store is benched; this write only reaches the durable tier
        f.store.set("a", "new".into()).await.unwrap();
        assert_eq!(f.hot.raw("a").as_deref(), Some("old"));

        f.clock.advance_secs(61);
        assert_eq!(f.store.get("a").await.unwrap().as_deref(), Some("new"));

        // A healthy write refreshes the hot copy and clears the stale mark
        f.store.set("a", "newest".into()).await.unwrap();
        assert_eq!(f.hot.raw("a").as_deref(), Some("newest"));
        assert_eq!(f.store.get("a").await.unwrap().as_deref(), Some("newest"));
    }

    #[tokio::test]
    async fn test_remove_and_remove_prefix_hit_both_tiers() {
        let f = fixture(10);
        for key in ["@cache:a", "@cache:b", "other"] {
            f.store.set(key, "v".into()).await.unwrap();
        }

        f.store.remove("other").await.unwrap();
        assert!(f.hot.raw("other").is_none());
        assert!(f.durable.raw("other").is_none());

        let removed = f.store.remove_prefix("@cache:").await.unwrap();
        assert_eq!(removed, 2);
        assert!(f.hot.is_empty());
        assert!(f.durable.is_empty());
    }

    #[tokio::test]
    async fn test_durable_only() {
        let durable = Arc::new(InMemoryStore::new());
        let store = FallbackStore::durable_only(durable.clone(), Arc::new(ManualClock::new()));

        store.set("k", "v".into()).await.unwrap();
        assert!(!store.hot_available());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.list_keys().await.unwrap(), vec!["k".to_string()]);
    }
}
