// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Hybrid Sync
//!
//! An offline-first storage and sync engine for study data (flashcards,
//! sessions, settings, logic nodes). Every read and write goes to the remote
//! store first and degrades to a local tiered cache when the network is gone,
//! so the UI never waits on connectivity and writes are never lost to it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Domain layer (StudyStore)                  │
//! │  • get_flashcards / save_flashcards / get_settings / ...    │
//! │  • Registers replay handlers + connectivity probe           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Orchestrator (HybridSync)                   │
//! │  • hybrid_get: remote → cache → caller default              │
//! │  • hybrid_set: remote, else cache + enqueue                 │
//! │  • background_sync: single-flight FIFO drain of the queue   │
//! └─────────────────────────────────────────────────────────────┘
//!               │                               │
//!               ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │   Tiered cache manager   │   │   Sync queue + dead letters  │
//! │  • memory tier, LRU      │   │  • one JSON record each      │
//! │  • hot/warm/cold TTLs    │   │  • max 3 attempts per item   │
//! └──────────────────────────┘   └──────────────────────────────┘
//!               │                               │
//!               ▼                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 FallbackStore (durable tier)                │
//! │  • optional hot store (Redis), cooldown when full           │
//! │  • durable store (SQLite / in-memory) always written        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hybrid_sync::{HybridSync, HybridSyncConfig, CacheTier, WriteOutcome};
//! use hybrid_sync::storage::memory::InMemoryStore;
//! use hybrid_sync::remote::RemoteError;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let sync = HybridSync::builder(HybridSyncConfig::default())
//!         .durable(Arc::new(InMemoryStore::new()))
//!         .build()
//!         .await;
//!
//!     // Remote is down: the write is cached and queued, not lost.
//!     let outcome = sync
//!         .hybrid_set(
//!             |_data| async { Err::<(), _>(RemoteError::Unavailable("offline".into())) },
//!             "settings",
//!             json!({"theme": "dark"}),
//!         )
//!         .await;
//!     assert_eq!(outcome, WriteOutcome::Queued);
//!
//!     // Reads fall back to the cache.
//!     let settings = sync
//!         .hybrid_get(
//!             || async { Err::<serde_json::Value, _>(RemoteError::Timeout) },
//!             "settings",
//!             json!({}),
//!         )
//!         .await;
//!     assert_eq!(settings["theme"], "dark");
//!     # let _ = CacheTier::Hot;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`coordinator`]: the [`HybridSync`] orchestrator
//! - [`cache`]: two-level cache with TTL tiers and LRU eviction
//! - [`queue`]: durable sync queue and dead-letter record
//! - [`storage`]: store adapters (in-memory, SQLite, Redis) and the hot/durable fallback layer
//! - [`resilience`]: connectivity tracking, retry, best-effort helper
//! - [`domain`]: study-data records and the [`StudyStore`] facade
//! - [`remote`]: remote error type and backend trait

pub mod config;
pub mod clock;
pub mod storage;
pub mod resilience;
pub mod eviction;
pub mod cache;
pub mod queue;
pub mod remote;
pub mod coordinator;
pub mod domain;
pub mod metrics;

pub use config::HybridSyncConfig;
pub use clock::{Clock, SystemClock, ManualClock};
pub use cache::{CacheEntry, CacheTier, TieredCache};
pub use queue::{QueueItem, DeadLetter, DeadLetterReason};
pub use coordinator::{HybridSync, HybridSyncBuilder, SyncReport, StorageInfo, WriteOutcome};
pub use storage::traits::{KvStore, StorageError};
pub use storage::fallback::FallbackStore;
pub use remote::{RemoteBackend, RemoteError, ReplayError};
pub use domain::{StorageKey, StudyStore, Flashcard, StudySession, UserSettings, LogicNode};
pub use resilience::connectivity::Connectivity;
pub use resilience::retry::RetryConfig;
