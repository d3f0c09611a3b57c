// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Store is full: {0}")]
    CapacityExceeded(String),
    #[error("Corrupt record under '{key}': {reason}")]
    Corrupt {
        key: String,
        reason: String,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Minimal persistent key → string store.
///
/// Both the durable local store and the optional hot store implement this.
/// No transactions and no ordering guarantees across keys.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
    async fn list_keys(&self) -> Result<Vec<String>, StorageError>;

    /// Whether the store currently considers itself usable.
    /// Stores with no notion of health are always healthy.
    fn is_healthy(&self) -> bool {
        true
    }

    /// Remove every key starting with `prefix`, returning how many went.
    /// Default implementation lists then removes one by one.
    async fn remove_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        let keys: Vec<String> = self
            .list_keys()
            .await?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect();
        for key in &keys {
            self.remove(key).await?;
        }
        Ok(keys.len())
    }
}
