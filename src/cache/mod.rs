// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Tiered cache: memory map over a durable key-value store.
//!
//! - `entry.rs`   - [`CacheEntry`] record and [`CacheTier`] TTL classes
//! - `size.rs`    - sampling size estimator for the memory budget
//! - `manager.rs` - [`TieredCache`] read/write/evict/invalidate

pub mod entry;
pub mod size;
pub mod manager;

pub use entry::{CacheEntry, CacheTier, TierTtls};
pub use manager::TieredCache;
pub use size::SizeEstimator;
