// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use dashmap::DashMap;
use super::traits::{KvStore, StorageError};

/// Process-local key → string store.
///
/// Used as the durable tier in tests and for ephemeral sessions, and as a
/// stand-in hot store. Optionally bounded by entry count to mimic a
/// capacity-limited hot cache: writes of new keys past the limit fail with
/// [`StorageError::CapacityExceeded`].
pub struct InMemoryStore {
    data: DashMap<String, String>,
    max_entries: Option<usize>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            max_entries: None,
        }
    }

    /// Store that rejects new keys once `max_entries` are held.
    #[must_use]
    pub fn with_capacity_limit(max_entries: usize) -> Self {
        Self {
            data: DashMap::new(),
            max_entries: Some(max_entries),
        }
    }

    /// Get current item count
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read a raw value without going through the trait (test helper).
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.data.get(key).map(|r| r.value().clone())
    }

    /// Clear all items
    pub fn clear(&self) {
        self.data.clear();
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.data.get(key).map(|r| r.value().clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        if let Some(max) = self.max_entries {
            if !self.data.contains_key(key) && self.data.len() >= max {
                return Err(StorageError::CapacityExceeded(format!(
                    "{} entries (max {})",
                    self.data.len(),
                    max
                )));
            }
        }
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.data.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.data.iter().map(|r| r.key().clone()).collect())
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        let before = self.data.len();
        self.data.retain(|k, _| !k.starts_with(prefix));
        Ok(before.saturating_sub(self.data.len()))
    }
}
