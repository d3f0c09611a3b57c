// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Remote authoritative store seam.
//!
//! The orchestrator never talks to the network itself. Callers hand it
//! fetch/save closures (or a [`RemoteBackend`] via the domain layer), and
//! every error they return is treated the same way: the remote is
//! unreachable right now.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Flashcard, LogicNode, StudySession, UserSettings};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Remote unavailable: {0}")]
    Unavailable(String),
    #[error("Remote call timed out")]
    Timeout,
    #[error("Remote rejected the request ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
    },
}

/// Failure replaying a queued write.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("Queued payload does not decode: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Per-domain fetch/save against the authoritative store.
///
/// Timeouts are the implementation's concern; return
/// [`RemoteError::Timeout`] and the engine takes its offline path.
#[async_trait]
pub trait RemoteBackend: Send + Sync + 'static {
    async fn fetch_flashcards(&self) -> Result<Vec<Flashcard>, RemoteError>;
    async fn save_flashcards(&self, cards: Vec<Flashcard>) -> Result<(), RemoteError>;

    async fn fetch_sessions(&self) -> Result<Vec<StudySession>, RemoteError>;
    async fn save_sessions(&self, sessions: Vec<StudySession>) -> Result<(), RemoteError>;

    async fn fetch_settings(&self) -> Result<UserSettings, RemoteError>;
    async fn save_settings(&self, settings: UserSettings) -> Result<(), RemoteError>;

    async fn fetch_logic_nodes(&self) -> Result<Vec<LogicNode>, RemoteError>;
    async fn save_logic_nodes(&self, nodes: Vec<LogicNode>) -> Result<(), RemoteError>;

    /// Delete every record the user owns.
    async fn clear_all(&self) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RemoteError::Rejected { status: 503, message: "maintenance".into() };
        assert_eq!(err.to_string(), "Remote rejected the request (503): maintenance");

        let replay: ReplayError = RemoteError::Timeout.into();
        assert_eq!(replay.to_string(), "Remote call timed out");
    }
}
