// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Two-level read-through / write-through cache.
//!
//! ```text
//!   get ──► memory (unexpired) ──► durable (unexpired, promote @ warm) ──► miss
//!   set ──► memory (hot/warm, LRU-evict to fit) + durable (always)
//! ```
//!
//! The memory map lives behind a `parking_lot::Mutex`. Every mutation of it
//! (evict + insert, remove, sweep) happens inside one lock scope and the lock
//! is never held across an `.await`, so a concurrent task can never observe a
//! half-applied change.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::entry::{CacheEntry, CacheTier, TierTtls};
use super::size::SizeEstimator;
use crate::clock::Clock;
use crate::config::HybridSyncConfig;
use crate::eviction::lru::{EvictionCandidate, LruPolicy};
use crate::storage::traits::{KvStore, StorageError};

struct MemoryEntry {
    entry: CacheEntry<Value>,
    size_bytes: usize,
}

#[derive(Default)]
struct MemoryTier {
    entries: HashMap<String, MemoryEntry>,
    total_bytes: usize,
}

impl MemoryTier {
    fn remove(&mut self, key: &str) -> Option<MemoryEntry> {
        let removed = self.entries.remove(key)?;
        self.total_bytes = self.total_bytes.saturating_sub(removed.size_bytes);
        Some(removed)
    }

    fn publish_gauges(&self) {
        crate::metrics::set_memory_cache_bytes(self.total_bytes);
        crate::metrics::set_memory_cache_items(self.entries.len());
    }
}

/// Memory + durable cache with per-tier TTL and LRU eviction.
pub struct TieredCache {
    memory: Mutex<MemoryTier>,
    durable: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    policy: LruPolicy,
    estimator: SizeEstimator,
    ttls: TierTtls,
    budget_bytes: usize,
    namespace: String,
}

impl TieredCache {
    pub fn new(config: &HybridSyncConfig, durable: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            memory: Mutex::new(MemoryTier::default()),
            durable,
            clock,
            policy: LruPolicy,
            estimator: SizeEstimator::new(config.size_sample_threshold, config.size_sample_len),
            ttls: TierTtls::from_config(config),
            budget_bytes: config.memory_budget_bytes,
            namespace: config.cache_namespace.clone(),
        }
    }

    fn durable_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════════════

    /// Typed read. A payload that does not decode as `T` is purged and
    /// reported as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(key, error = %e, "Cached payload does not decode, purging");
                crate::metrics::record_corruption("memory");
                if let Err(e) = self.delete(key).await {
                    warn!(key, error = %e, "Failed to purge undecodable entry");
                }
                None
            }
        }
    }

    /// Untyped read: memory first, then durable with promotion.
    #[instrument(skip(self), fields(tier))]
    pub async fn get_value(&self, key: &str) -> Option<Value> {
        let now = self.clock.now_ms();

        if let Some(value) = self.memory_lookup(key, now) {
            tracing::Span::current().record("tier", "memory");
            crate::metrics::record_operation("memory", "get", "hit");
            return Some(value);
        }
        crate::metrics::record_operation("memory", "get", "miss");

        let entry = self.durable_lookup(key, now).await?;
        tracing::Span::current().record("tier", "durable");

        // Promote into memory as warm with a fresh timestamp
        let mut promoted = CacheEntry::new(entry.data, CacheTier::Warm, now);
        promoted.access_count = entry.access_count.saturating_add(1);
        let size = self.estimator.estimate(&promoted.data);
        let value = promoted.data.clone();
        self.insert_memory(key, promoted, size);

        Some(value)
    }

    fn memory_lookup(&self, key: &str, now: u64) -> Option<Value> {
        let mut memory = self.memory.lock();
        let expired = match memory.entries.get_mut(key) {
            None => return None,
            Some(slot) if slot.entry.is_expired(&self.ttls, now) => true,
            Some(slot) => {
                slot.entry.touch(now);
                return Some(slot.entry.data.clone());
            }
        };
        if expired {
            memory.remove(key);
            memory.publish_gauges();
            debug!(key, "Memory entry expired on read");
            crate::metrics::record_operation("memory", "get", "expired");
        }
        None
    }

    async fn durable_lookup(&self, key: &str, now: u64) -> Option<CacheEntry<Value>> {
        let durable_key = self.durable_key(key);
        let raw = match self.durable.get(&durable_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                crate::metrics::record_operation("durable", "get", "miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "Durable cache read failed, treating as miss");
                crate::metrics::record_operation("durable", "get", "error");
                return None;
            }
        };

        let entry: CacheEntry<Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Corrupt durable cache record, purging");
                crate::metrics::record_corruption("durable");
                self.purge_durable(&durable_key).await;
                return None;
            }
        };

        if entry.is_expired(&self.ttls, now) {
            debug!(key, tier = %entry.tier, "Durable entry expired on read");
            crate::metrics::record_operation("durable", "get", "expired");
            self.purge_durable(&durable_key).await;
            return None;
        }

        crate::metrics::record_operation("durable", "get", "hit");
        Some(entry)
    }

    async fn purge_durable(&self, durable_key: &str) {
        if let Err(e) = self.durable.remove(durable_key).await {
            warn!(key = durable_key, error = %e, "Failed to purge durable cache record");
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Writes
    // ═══════════════════════════════════════════════════════════════════════════

    /// Typed write.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, tier: CacheTier) -> Result<(), StorageError> {
        let value = serde_json::to_value(value)?;
        self.set_value(key, value, tier).await
    }

    /// Write `value` at `tier`.
    ///
    /// Hot and warm entries go to memory (evicting LRU entries to fit) and
    /// every entry goes to the durable tier. A value too large for the
    /// memory budget is only written durably. Cold writes drop any memory
    /// copy so the newest value is the one that gets read.
    #[instrument(skip(self, value), fields(tier = %tier))]
    pub async fn set_value(&self, key: &str, value: Value, tier: CacheTier) -> Result<(), StorageError> {
        let now = self.clock.now_ms();
        let entry = CacheEntry::new(value, tier, now);
        let record = serde_json::to_string(&entry)?;

        if tier.is_memory_resident() {
            let size = self.estimator.estimate(&entry.data);
            self.insert_memory(key, entry, size);
        } else {
            let mut memory = self.memory.lock();
            if memory.remove(key).is_some() {
                memory.publish_gauges();
            }
        }

        let _timer = crate::metrics::LatencyTimer::new("durable", "set");
        match self.durable.set(&self.durable_key(key), record).await {
            Ok(()) => {
                crate::metrics::record_operation("durable", "set", "success");
                Ok(())
            }
            Err(e) => {
                crate::metrics::record_operation("durable", "set", "error");
                Err(e)
            }
        }
    }

    /// Evict then insert, atomically with respect to other cache calls.
    /// Returns whether the entry landed in memory.
    fn insert_memory(&self, key: &str, entry: CacheEntry<Value>, size_bytes: usize) -> bool {
        let mut memory = self.memory.lock();

        // The old copy is replaced either way
        memory.remove(key);

        if size_bytes > self.budget_bytes {
            memory.publish_gauges();
            debug!(key, size_bytes, budget = self.budget_bytes, "Entry larger than memory budget, durable only");
            return false;
        }

        let needed = (memory.total_bytes + size_bytes).saturating_sub(self.budget_bytes);
        if needed > 0 {
            let candidates: Vec<EvictionCandidate> = memory
                .entries
                .iter()
                .map(|(k, slot)| EvictionCandidate {
                    key: k.clone(),
                    size_bytes: slot.size_bytes,
                    last_accessed_ms: slot.entry.last_accessed,
                    access_count: slot.entry.access_count,
                })
                .collect();

            let victims = self.policy.select_victims(&candidates, needed);
            let mut freed = 0usize;
            for victim in &victims {
                if let Some(slot) = memory.remove(victim) {
                    freed += slot.size_bytes;
                }
            }
            debug!(key, evicted = victims.len(), freed, "LRU eviction");
            crate::metrics::record_eviction(victims.len(), freed);
        }

        memory.entries.insert(key.to_string(), MemoryEntry { entry, size_bytes });
        memory.total_bytes += size_bytes;
        memory.publish_gauges();
        true
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Removal & maintenance
    // ═══════════════════════════════════════════════════════════════════════════

    /// Remove `key` from both tiers.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        {
            let mut memory = self.memory.lock();
            if memory.remove(key).is_some() {
                memory.publish_gauges();
            }
        }
        self.durable.remove(&self.durable_key(key)).await?;
        crate::metrics::record_operation("durable", "delete", "success");
        Ok(())
    }

    /// Remove every entry whose key starts with `prefix` from both tiers.
    ///
    /// Returns the number of durable records removed. Every cached key has a
    /// durable record, so this is the number of logical entries dropped.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, prefix: &str) -> Result<usize, StorageError> {
        let from_memory = {
            let mut memory = self.memory.lock();
            let before = memory.entries.len();
            memory.entries.retain(|k, _| !k.starts_with(prefix));
            memory.total_bytes = memory.entries.values().map(|s| s.size_bytes).sum();
            memory.publish_gauges();
            before - memory.entries.len()
        };

        let removed = self.durable.remove_prefix(&self.durable_key(prefix)).await?;
        debug!(prefix, from_memory, removed, "Invalidated cache prefix");
        crate::metrics::record_operation("durable", "invalidate", "success");
        Ok(removed)
    }

    /// Purge expired memory entries. Returns how many were dropped.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let mut memory = self.memory.lock();
        let expired: Vec<String> = memory
            .entries
            .iter()
            .filter(|(_, slot)| slot.entry.is_expired(&self.ttls, now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            memory.remove(key);
        }
        memory.publish_gauges();
        if !expired.is_empty() {
            debug!(purged = expired.len(), "Cache cleanup sweep");
        }
        expired.len()
    }

    /// Drop everything this cache owns in both tiers.
    pub async fn clear(&self) -> Result<usize, StorageError> {
        {
            let mut memory = self.memory.lock();
            memory.entries.clear();
            memory.total_bytes = 0;
            memory.publish_gauges();
        }
        self.durable.remove_prefix(&self.namespace).await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Introspection
    // ═══════════════════════════════════════════════════════════════════════════

    /// Number of entries in the memory tier.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memory.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memory.lock().entries.is_empty()
    }

    /// Sum of estimated sizes of memory-tier entries.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        self.memory.lock().total_bytes
    }

    #[must_use]
    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }

    /// Whether `key` is currently resident in memory (expired or not).
    #[must_use]
    pub fn in_memory(&self, key: &str) -> bool {
        self.memory.lock().entries.contains_key(key)
    }

    pub fn estimate_size(&self, value: &Value) -> usize {
        self.estimator.estimate(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::memory::InMemoryStore;
    use serde_json::json;

    struct Fixture {
        cache: TieredCache,
        durable: Arc<InMemoryStore>,
        clock: ManualClock,
    }

    fn fixture_with(config: HybridSyncConfig) -> Fixture {
        let durable = Arc::new(InMemoryStore::new());
        let clock = ManualClock::at_ms(1_000_000);
        let cache = TieredCache::new(&config, durable.clone(), Arc::new(clock.clone()));
        Fixture { cache, durable, clock }
    }

    fn fixture() -> Fixture {
        fixture_with(HybridSyncConfig::default())
    }

    fn small_budget(bytes: usize) -> HybridSyncConfig {
        HybridSyncConfig {
            memory_budget_bytes: bytes,
            ..HybridSyncConfig::default()
        }
    }

    #[tokio::test]
    async fn test_read_your_writes() {
        let f = fixture();
        f.cache.set("settings", &json!({"theme": "dark"}), CacheTier::Hot).await.unwrap();

        let got: Value = f.cache.get("settings").await.unwrap();
        assert_eq!(got, json!({"theme": "dark"}));
        assert!(f.cache.in_memory("settings"));
        assert!(f.durable.raw("@cache:settings").is_some());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let f = fixture();
        f.cache.set("x", &"A", CacheTier::Warm).await.unwrap();
        f.cache.set("x", &"B", CacheTier::Warm).await.unwrap();

        assert_eq!(f.cache.get::<String>("x").await.as_deref(), Some("B"));
        assert_eq!(f.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_cold_writes_skip_memory() {
        let f = fixture();
        f.cache.set("x", &1, CacheTier::Warm).await.unwrap();
        f.cache.set("x", &2, CacheTier::Cold).await.unwrap();

        assert!(!f.cache.in_memory("x"));
        // Durable read promotes the cold value
        assert_eq!(f.cache.get::<i32>("x").await, Some(2));
        assert!(f.cache.in_memory("x"));
    }

    #[tokio::test]
    async fn test_hot_entry_expires_in_both_tiers() {
        let f = fixture();
        f.cache.set("k", &"v", CacheTier::Hot).await.unwrap();

        f.clock.advance_ms(HybridSyncConfig::default().hot_ttl_ms + 1);
        assert_eq!(f.cache.get::<String>("k").await, None);
        // The durable copy is purged too
        assert!(f.durable.raw("@cache:k").is_none());
        assert!(!f.cache.in_memory("k"));
    }

    #[tokio::test]
    async fn test_durable_hit_promotes_as_warm() {
        let f = fixture();
        f.cache.set("k", &"v", CacheTier::Cold).await.unwrap();

        f.clock.advance_ms(HybridSyncConfig::default().hot_ttl_ms + 1);
        assert_eq!(f.cache.get::<String>("k").await.as_deref(), Some("v"));
        assert!(f.cache.in_memory("k"));

        // Promoted copy follows the warm TTL from the promotion time
        f.clock.advance_ms(HybridSyncConfig::default().warm_ttl_ms - 1);
        assert!(f.cache.in_memory("k"));
        assert_eq!(f.cache.cleanup(), 0);
        f.clock.advance_ms(1);
        assert_eq!(f.cache.cleanup(), 1);
    }

    #[tokio::test]
    async fn test_memory_budget_evicts_lru() {
        // Each "aaaaaaaa" string serializes to 10 bytes
        let f = fixture_with(small_budget(25));
        f.cache.set("a", &"aaaaaaaa", CacheTier::Hot).await.unwrap();
        f.clock.advance_ms(1);
        f.cache.set("b", &"bbbbbbbb", CacheTier::Hot).await.unwrap();
        f.clock.advance_ms(1);

        // Touch "a" so "b" becomes least recently used
        assert!(f.cache.get::<String>("a").await.is_some());
        f.clock.advance_ms(1);

        f.cache.set("c", &"cccccccc", CacheTier::Hot).await.unwrap();
        assert!(f.cache.in_memory("a"));
        assert!(!f.cache.in_memory("b"));
        assert!(f.cache.in_memory("c"));
        assert!(f.cache.memory_bytes() <= 25);

        // Evicted entries are still served from the durable tier
        assert_eq!(f.cache.get::<String>("b").await.as_deref(), Some("bbbbbbbb"));
    }

    #[tokio::test]
    async fn test_oversize_value_goes_durable_only() {
        let f = fixture_with(small_budget(8));
        f.cache.set("small", &"ab", CacheTier::Hot).await.unwrap();
        f.cache.set("huge", &"this is far too large", CacheTier::Hot).await.unwrap();

        assert!(f.cache.in_memory("small"));
        assert!(!f.cache.in_memory("huge"));
        assert!(f.durable.raw("@cache:huge").is_some());
    }

    #[tokio::test]
    async fn test_delete_and_invalidate() {
        let f = fixture();
        for key in ["flashcards:1", "flashcards:2", "settings"] {
            f.cache.set(key, &key, CacheTier::Warm).await.unwrap();
        }

        f.cache.delete("settings").await.unwrap();
        assert_eq!(f.cache.get::<String>("settings").await, None);

        let removed = f.cache.invalidate("flashcards:").await.unwrap();
        assert_eq!(removed, 2);
        assert!(f.cache.is_empty());
        assert_eq!(f.cache.memory_bytes(), 0);
        assert!(f.durable.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_durable_record_is_purged() {
        let f = fixture();
        f.durable.set("@cache:bad", "{not json".to_string()).await.unwrap();

        assert_eq!(f.cache.get::<Value>("bad").await, None);
        assert!(f.durable.raw("@cache:bad").is_none());
    }

    #[tokio::test]
    async fn test_wrong_type_is_purged() {
        let f = fixture();
        f.cache.set("n", &"not a number", CacheTier::Warm).await.unwrap();

        assert_eq!(f.cache.get::<u32>("n").await, None);
        assert!(!f.cache.in_memory("n"));
        assert!(f.durable.raw("@cache:n").is_none());
    }

    #[tokio::test]
    async fn test_clear_leaves_foreign_keys() {
        let f = fixture();
        f.durable.set("@sync_queue", "[]".to_string()).await.unwrap();
        f.cache.set("a", &1, CacheTier::Hot).await.unwrap();
        f.cache.set("b", &2, CacheTier::Cold).await.unwrap();

        assert_eq!(f.cache.clear().await.unwrap(), 2);
        assert!(f.cache.is_empty());
        assert_eq!(f.durable.raw("@sync_queue").as_deref(), Some("[]"));
    }
}
