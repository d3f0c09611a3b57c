// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Durable queue of writes that did not reach the remote store.
//!
//! ```text
//!   hybrid_set fails ──► SyncQueue (FIFO, one JSON array record)
//!                           │
//!        background_sync ◄──┘  success → dropped
//!                              failure → attempts += 1, kept in order
//!                              exhausted / unknown / undecodable
//!                                  └──► DeadLetterStore (bounded record)
//! ```
//!
//! Both records are rewritten whole after every change. The in-memory copy
//! is authoritative while the process runs; the durable copy is what a
//! restart resumes from.

mod persisted;
pub mod pending;
pub mod dead_letter;

pub use pending::{QueueItem, SyncQueue};
pub use dead_letter::{DeadLetter, DeadLetterReason, DeadLetterStore};
