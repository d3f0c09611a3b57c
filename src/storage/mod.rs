// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Store adapters.
//!
//! - [`traits::KvStore`]: the key → string contract every adapter meets
//! - [`memory::InMemoryStore`]: DashMap store for tests and ephemeral use
//! - [`sqlite::SqliteStore`]: durable local store
//! - [`redis::RedisHotStore`]: capacity-limited hot store
//! - [`fallback::FallbackStore`]: hot store in front of the durable store

pub mod traits;
pub mod memory;
pub mod sqlite;
pub mod redis;
pub mod fallback;
