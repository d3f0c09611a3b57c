// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bounded record of queue items that were given up on.
//!
//! Nothing is replayed from here automatically. The record exists so a
//! dropped write can be inspected, exported or re-submitted by the host.

use std::collections::VecDeque;
use std::sync::Arc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::pending::QueueItem;
use super::persisted::{load_record, save_record};
use crate::storage::traits::{KvStore, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DeadLetterReason {
    /// Replay failed on every allowed attempt
    RetriesExhausted,
    /// No replay handler is registered for the item's key
    UnknownDomain,
    /// The payload no longer decodes as the domain's type
    Undecodable { detail: String },
}

impl DeadLetterReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RetriesExhausted => "retries_exhausted",
            Self::UnknownDomain => "unknown_domain",
            Self::Undecodable { .. } => "undecodable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub item: QueueItem,
    pub reason: DeadLetterReason,
    /// Epoch millis when the item left the queue
    pub dropped_at: u64,
}

pub struct DeadLetterStore {
    letters: Mutex<VecDeque<DeadLetter>>,
    store: Arc<dyn KvStore>,
    key: String,
    capacity: usize,
    persist_lock: tokio::sync::Mutex<()>,
}

impl DeadLetterStore {
    pub async fn load(store: Arc<dyn KvStore>, key: impl Into<String>, capacity: usize) -> Self {
        let key = key.into();
        let mut letters: VecDeque<DeadLetter> = load_record(store.as_ref(), &key).await;
        while letters.len() > capacity {
            letters.pop_front();
        }
        Self {
            letters: Mutex::new(letters),
            store,
            key,
            capacity,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Append letters (oldest dropped past capacity) and persist.
    pub async fn record(&self, batch: Vec<DeadLetter>) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }
        {
            let mut letters = self.letters.lock();
            for letter in batch {
                warn!(
                    key = %letter.item.key,
                    attempts = letter.item.attempts,
                    reason = letter.reason.as_str(),
                    "Pending write dead-lettered"
                );
                crate::metrics::record_dead_letter(letter.reason.as_str());
                letters.push_back(letter);
            }
            while letters.len() > self.capacity {
                letters.pop_front();
            }
        }
        self.persist().await
    }

    async fn persist(&self) -> Result<(), StorageError> {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.list();
        save_record(self.store.as_ref(), &self.key, &snapshot).await
    }

    /// Oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<DeadLetter> {
        self.letters.lock().iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.letters.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.letters.lock().is_empty()
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.persist_lock.lock().await;
        self.letters.lock().clear();
        self.store.remove(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStore;
    use serde_json::json;

    const KEY: &str = "@sync_dead_letters";

    fn letter(key: &str, reason: DeadLetterReason) -> DeadLetter {
        DeadLetter {
            item: QueueItem { key: key.to_string(), data: json!(null), timestamp: 1, attempts: 3 },
            reason,
            dropped_at: 10,
        }
    }

    #[tokio::test]
    async fn test_record_and_reload() {
        let store = Arc::new(InMemoryStore::new());
        let dl = DeadLetterStore::load(store.clone(), KEY, 10).await;
        dl.record(vec![
            letter("settings", DeadLetterReason::RetriesExhausted),
            letter("mystery", DeadLetterReason::UnknownDomain),
        ])
        .await
        .unwrap();

        let reloaded = DeadLetterStore::load(store, KEY, 10).await;
        assert_eq!(reloaded.list(), dl.list());
        assert_eq!(reloaded.list()[1].reason, DeadLetterReason::UnknownDomain);
    }

    #[tokio::test]
    async fn test_capacity_drops_oldest() {
        let store = Arc::new(InMemoryStore::new());
        let dl = DeadLetterStore::load(store, KEY, 2).await;
        for key in ["a", "b", "c"] {
            dl.record(vec![letter(key, DeadLetterReason::RetriesExhausted)]).await.unwrap();
        }

        let keys: Vec<String> = dl.list().into_iter().map(|l| l.item.key).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_empty_batch_does_not_write() {
        let store = Arc::new(InMemoryStore::new());
        let dl = DeadLetterStore::load(store.clone(), KEY, 2).await;
        dl.record(Vec::new()).await.unwrap();
        assert!(store.raw(KEY).is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = Arc::new(InMemoryStore::new());
        let dl = DeadLetterStore::load(store.clone(), KEY, 2).await;
        dl.record(vec![letter("a", DeadLetterReason::Undecodable { detail: "bad".into() })]).await.unwrap();

        dl.clear().await.unwrap();
        assert!(dl.is_empty());
        assert!(store.raw(KEY).is_none());
    }

    #[test]
    fn test_reason_format() {
        let encoded = serde_json::to_value(DeadLetterReason::Undecodable { detail: "x".into() }).unwrap();
        assert_eq!(encoded, json!({"kind": "undecodable", "detail": "x"}));
    }
}
