// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Study-data domains on top of the orchestrator.
//!
//! Each domain is one [`StorageKey`], one record type and one fetch/save
//! pair on the [`RemoteBackend`](crate::remote::RemoteBackend).
//! [`StudyStore`] binds them together and registers the replay handlers so
//! queued writes find their way back to the right remote call.

pub mod models;
pub mod store;

pub use models::{Flashcard, LogicNode, StorageKey, StudySession, UserSettings};
pub use store::StudyStore;
