// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Eviction policy for the memory tier.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Eviction Module                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  lru.rs   - Pure LRU by last access                          │
//! │  └─ EvictionCandidate: key, size, recency metadata           │
//! │  └─ LruPolicy: oldest-first until enough bytes are freed     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`TieredCache`](crate::cache::TieredCache) builds candidates from its
//! memory map and calls `select_victims()` before any insert that would push
//! the tier past its byte budget. Only the memory tier is ever evicted; the
//! durable copy of a victim stays readable until its TTL runs out.

pub mod lru;
