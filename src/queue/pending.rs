// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::sync::Arc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::persisted::{load_record, save_record};
use crate::storage::traits::{KvStore, StorageError};

/// A write waiting to be replayed against the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Logical storage key, also the replay handler name
    pub key: String,
    /// Payload snapshot taken when the write failed
    pub data: Value,
    /// Epoch millis of the enqueue
    pub timestamp: u64,
    pub attempts: u32,
}

impl QueueItem {
    pub fn new(key: impl Into<String>, data: Value, timestamp: u64) -> Self {
        Self {
            key: key.into(),
            data,
            timestamp,
            attempts: 0,
        }
    }
}

struct QueueState {
    items: Vec<QueueItem>,
    /// Bumped by `clear()` so an in-flight drain does not resurrect items
    generation: u64,
}

/// Handle on the front of the queue taken by a drain.
#[derive(Debug)]
pub struct DrainSnapshot {
    pub items: Vec<QueueItem>,
    generation: u64,
}

/// FIFO of pending remote writes, persisted as one JSON array.
pub struct SyncQueue {
    state: Mutex<QueueState>,
    store: Arc<dyn KvStore>,
    key: String,
    /// Serializes persists; the snapshot is taken after acquiring it so the
    /// last writer always stores the latest state
    persist_lock: tokio::sync::Mutex<()>,
}

impl SyncQueue {
    /// Restore the queue from `store`, or start empty.
    pub async fn load(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let items: Vec<QueueItem> = load_record(store.as_ref(), &key).await;
        if !items.is_empty() {
            info!(key = %key, pending = items.len(), "Restored sync queue");
        }
        crate::metrics::set_queue_length(items.len());

        Self {
            state: Mutex::new(QueueState { items, generation: 0 }),
            store,
            key,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Copy of the current queue contents in order.
    #[must_use]
    pub fn items(&self) -> Vec<QueueItem> {
        self.state.lock().items.clone()
    }

    /// Payload of the newest pending write for `key`, if any.
    #[must_use]
    pub fn latest(&self, key: &str) -> Option<Value> {
        self.state
            .lock()
            .items
            .iter()
            .rev()
            .find(|item| item.key == key)
            .map(|item| item.data.clone())
    }

    /// Append and persist.
    pub async fn enqueue(&self, item: QueueItem) -> Result<(), StorageError> {
        {
            let mut state = self.state.lock();
            debug!(key = %item.key, position = state.items.len(), "Enqueued pending write");
            state.items.push(item);
            crate::metrics::set_queue_length(state.items.len());
        }
        self.persist().await
    }

    /// Snapshot the current contents for a drain. Items stay queued (and
    /// visible to `len()`) until [`settle`](Self::settle) is called.
    pub fn begin_drain(&self) -> DrainSnapshot {
        let state = self.state.lock();
        DrainSnapshot {
            items: state.items.clone(),
            generation: state.generation,
        }
    }

    /// Replace the drained prefix with `retained`, keeping anything
    /// enqueued while the drain ran behind it.
    pub fn settle(&self, snapshot: DrainSnapshot, retained: Vec<QueueItem>) {
        let mut state = self.state.lock();
        if state.generation != snapshot.generation {
            debug!("Queue cleared during drain, discarding drain result");
            return;
        }
        let processed = snapshot.items.len().min(state.items.len());
        let newer = state.items.split_off(processed);
        state.items = retained;
        state.items.extend(newer);
        crate::metrics::set_queue_length(state.items.len());
    }

    /// Write the current contents to the durable store.
    pub async fn persist(&self) -> Result<(), StorageError> {
        let _guard = self.persist_lock.lock().await;
        let items = self.items();
        save_record(self.store.as_ref(), &self.key, &items).await
    }

    /// Drop every pending item, in memory and on disk.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.persist_lock.lock().await;
        {
            let mut state = self.state.lock();
            state.items.clear();
            state.generation += 1;
            crate::metrics::set_queue_length(0);
        }
        self.store.remove(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStore;
    use serde_json::json;

    const KEY: &str = "@sync_queue";

    async fn queue() -> (SyncQueue, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (SyncQueue::load(store.clone(), KEY).await, store)
    }

    #[tokio::test]
    async fn test_enqueue_persists_in_order() {
        let (q, store) = queue().await;
        q.enqueue(QueueItem::new("settings", json!({"theme": "dark"}), 1)).await.unwrap();
        q.enqueue(QueueItem::new("flashcards", json!([]), 2)).await.unwrap();

        assert_eq!(q.len(), 2);
        let on_disk: Vec<QueueItem> = serde_json::from_str(&store.raw(KEY).unwrap()).unwrap();
        assert_eq!(on_disk, q.items());
        assert_eq!(on_disk[0].key, "settings");
        assert_eq!(on_disk[0].attempts, 0);
    }

    #[tokio::test]
    async fn test_latest_returns_newest_payload_for_key() {
        let (q, _) = queue().await;
        assert_eq!(q.latest("settings"), None);

        q.enqueue(QueueItem::new("settings", json!({"theme": "dark"}), 1)).await.unwrap();
        q.enqueue(QueueItem::new("flashcards", json!([]), 2)).await.unwrap();
        q.enqueue(QueueItem::new("settings", json!({"theme": "light"}), 3)).await.unwrap();

        assert_eq!(q.latest("settings"), Some(json!({"theme": "light"})));
        assert_eq!(q.latest("flashcards"), Some(json!([])));
        assert_eq!(q.latest("sessions"), None);
    }

    #[tokio::test]
    async fn test_reload_restores_queue() {
        let (q, store) = queue().await;
        q.enqueue(QueueItem::new("settings", json!(1), 1)).await.unwrap();

        let reloaded = SyncQueue::load(store, KEY).await;
        assert_eq!(reloaded.items(), q.items());
    }

    #[tokio::test]
    async fn test_corrupt_record_starts_empty_and_is_purged() {
        let store = Arc::new(InMemoryStore::new());
        store.set(KEY, "[{\"key\":".to_string()).await.unwrap();

        let q = SyncQueue::load(store.clone(), KEY).await;
        assert!(q.is_empty());
        assert!(store.raw(KEY).is_none());
    }

    #[tokio::test]
    async fn test_settle_keeps_items_enqueued_during_drain() {
        let (q, _) = queue().await;
        q.enqueue(QueueItem::new("a", json!(1), 1)).await.unwrap();
        q.enqueue(QueueItem::new("b", json!(2), 2)).await.unwrap();

        let snapshot = q.begin_drain();
        assert_eq!(snapshot.items.len(), 2);
        q.enqueue(QueueItem::new("c", json!(3), 3)).await.unwrap();

        let mut retained = snapshot.items[1].clone();
        retained.attempts = 1;
        q.settle(snapshot, vec![retained]);

        let keys: Vec<String> = q.items().into_iter().map(|i| i.key).collect();
        assert_eq!(keys, vec!["b", "c"]);
        assert_eq!(q.items()[0].attempts, 1);
    }

    #[tokio::test]
    async fn test_clear_during_drain_wins() {
        let (q, store) = queue().await;
        q.enqueue(QueueItem::new("a", json!(1), 1)).await.unwrap();

        let snapshot = q.begin_drain();
        q.clear().await.unwrap();
        let retained = snapshot.items.clone();
        q.settle(snapshot, retained);

        assert!(q.is_empty());
        assert!(store.raw(KEY).is_none());
    }
}
