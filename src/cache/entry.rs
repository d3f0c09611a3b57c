// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use serde::{Deserialize, Serialize};

use crate::config::HybridSyncConfig;

/// Priority class of a cache entry.
///
/// Controls the TTL and whether the entry may live in the memory tier.
/// Cold entries are only ever written to the durable tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    Hot,
    Warm,
    Cold,
}

impl CacheTier {
    pub fn is_memory_resident(&self) -> bool {
        matches!(self, CacheTier::Hot | CacheTier::Warm)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTier::Hot => "hot",
            CacheTier::Warm => "warm",
            CacheTier::Cold => "cold",
        }
    }
}

impl std::fmt::Display for CacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tier time to live, in millis.
#[derive(Debug, Clone, Copy)]
pub struct TierTtls {
    pub hot_ms: u64,
    pub warm_ms: u64,
    pub cold_ms: u64,
}

impl TierTtls {
    pub fn from_config(config: &HybridSyncConfig) -> Self {
        Self {
            hot_ms: config.hot_ttl_ms,
            warm_ms: config.warm_ttl_ms,
            cold_ms: config.cold_ttl_ms,
        }
    }

    pub fn ttl_ms(&self, tier: CacheTier) -> u64 {
        match tier {
            CacheTier::Hot => self.hot_ms,
            CacheTier::Warm => self.warm_ms,
            CacheTier::Cold => self.cold_ms,
        }
    }
}

/// A cached value plus the bookkeeping needed for TTL and LRU.
///
/// This is also the on-disk record format: one JSON object per key under
/// the cache namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub data: T,
    /// Epoch millis when the entry was written; TTL counts from here
    pub timestamp: u64,
    pub access_count: u64,
    pub last_accessed: u64,
    pub tier: CacheTier,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, tier: CacheTier, now_ms: u64) -> Self {
        Self {
            data,
            timestamp: now_ms,
            access_count: 0,
            last_accessed: now_ms,
            tier,
        }
    }

    /// An entry is unreadable once its tier's TTL has elapsed.
    pub fn is_expired(&self, ttls: &TierTtls, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.timestamp) >= ttls.ttl_ms(self.tier)
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed = now_ms;
    }
}
