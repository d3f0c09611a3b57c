// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the hybrid sync engine.
//!
//! # Example
//!
//! ```
//! use hybrid_sync::HybridSyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = HybridSyncConfig::default();
//! assert_eq!(config.memory_budget_bytes, 10 * 1024 * 1024); // 10 MB
//! assert_eq!(config.max_sync_attempts, 3);
//!
//! // Tighter memory budget, faster background sync
//! let config = HybridSyncConfig {
//!     memory_budget_bytes: 512 * 1024,
//!     sync_interval_secs: 10,
//!     ..Default::default()
//! };
//! ```

use std::time::Duration;
use serde::Deserialize;

/// Configuration for the hybrid sync engine.
///
/// All fields have defaults; a config file may set any subset.
#[derive(Debug, Clone, Deserialize)]
pub struct HybridSyncConfig {
    /// Memory tier budget in estimated bytes (default: 10 MB)
    #[serde(default = "default_memory_budget_bytes")]
    pub memory_budget_bytes: usize,

    /// TTLs per cache tier, in milliseconds. Must satisfy hot < warm < cold.
    #[serde(default = "default_hot_ttl_ms")]
    pub hot_ttl_ms: u64,
    #[serde(default = "default_warm_ttl_ms")]
    pub warm_ttl_ms: u64,
    #[serde(default = "default_cold_ttl_ms")]
    pub cold_ttl_ms: u64,

    /// Failed deliveries before a queued write is dead-lettered
    #[serde(default = "default_max_sync_attempts")]
    pub max_sync_attempts: u32,

    /// How long the hot store is bypassed after reporting itself full
    #[serde(default = "default_hot_store_cooldown_ms")]
    pub hot_store_cooldown_ms: u64,

    /// Arrays longer than this are size-estimated from a sample
    #[serde(default = "default_size_sample_threshold")]
    pub size_sample_threshold: usize,
    /// Number of leading elements serialized when sampling
    #[serde(default = "default_size_sample_len")]
    pub size_sample_len: usize,

    /// Key namespace for cache entries in the durable store
    #[serde(default = "default_cache_namespace")]
    pub cache_namespace: String,
    /// Durable key holding the sync queue
    #[serde(default = "default_queue_key")]
    pub queue_key: String,
    /// Durable key holding dropped writes
    #[serde(default = "default_dead_letter_key")]
    pub dead_letter_key: String,
    /// Max dead letters kept (oldest dropped first)
    #[serde(default = "default_dead_letter_capacity")]
    pub dead_letter_capacity: usize,

    /// Periodic background sync in seconds (0 = disabled)
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// Periodic memory-tier sweep in seconds (0 = disabled)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Wake the run loop for a sync attempt as soon as a remote write fails
    #[serde(default = "default_signal_sync_on_write_failure")]
    pub signal_sync_on_write_failure: bool,
}

fn default_memory_budget_bytes() -> usize { 10 * 1024 * 1024 } // 10 MB
fn default_hot_ttl_ms() -> u64 { 5 * 60 * 1000 } // 5 minutes
fn default_warm_ttl_ms() -> u64 { 30 * 60 * 1000 } // 30 minutes
fn default_cold_ttl_ms() -> u64 { 24 * 60 * 60 * 1000 } // 24 hours
fn default_max_sync_attempts() -> u32 { 3 }
fn default_hot_store_cooldown_ms() -> u64 { 60 * 1000 }
fn default_size_sample_threshold() -> usize { 100 }
fn default_size_sample_len() -> usize { 10 }
fn default_cache_namespace() -> String { "@cache:".to_string() }
fn default_queue_key() -> String { "@sync_queue".to_string() }
fn default_dead_letter_key() -> String { "@sync_dead_letters".to_string() }
fn default_dead_letter_capacity() -> usize { 100 }
fn default_sync_interval_secs() -> u64 { 30 }
fn default_cleanup_interval_secs() -> u64 { 60 }
fn default_signal_sync_on_write_failure() -> bool { true }

impl Default for HybridSyncConfig {
    fn default() -> Self {
        Self {
            memory_budget_bytes: default_memory_budget_bytes(),
            hot_ttl_ms: default_hot_ttl_ms(),
            warm_ttl_ms: default_warm_ttl_ms(),
            cold_ttl_ms: default_cold_ttl_ms(),
            max_sync_attempts: default_max_sync_attempts(),
            hot_store_cooldown_ms: default_hot_store_cooldown_ms(),
            size_sample_threshold: default_size_sample_threshold(),
            size_sample_len: default_size_sample_len(),
            cache_namespace: default_cache_namespace(),
            queue_key: default_queue_key(),
            dead_letter_key: default_dead_letter_key(),
            dead_letter_capacity: default_dead_letter_capacity(),
            sync_interval_secs: default_sync_interval_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            signal_sync_on_write_failure: default_signal_sync_on_write_failure(),
        }
    }
}

impl HybridSyncConfig {
    /// Hot-store bypass window as a [`Duration`].
    #[must_use]
    pub fn hot_store_cooldown(&self) -> Duration {
        Duration::from_millis(self.hot_store_cooldown_ms)
    }
}
