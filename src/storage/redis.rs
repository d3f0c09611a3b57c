// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Redis-backed hot store.
//!
//! Plain string keys under an optional prefix. Redis is expected to run with
//! `maxmemory` and a `noeviction` policy, so a full instance answers writes
//! with an `OOM` error; that is surfaced as
//! [`StorageError::CapacityExceeded`] and lets the
//! [`FallbackStore`](super::fallback::FallbackStore) bench the hot tier.
//!
//! Operations are not retried: the durable store is always there to fall
//! back on, so a slow hot store is worse than a missing one.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use tracing::info;

use super::traits::{KvStore, StorageError};
use crate::resilience::retry::{retry, RetryConfig};

pub struct RedisHotStore {
    connection: ConnectionManager,
    /// Key prefix for namespacing (e.g., "study:" → "study:@cache:settings")
    prefix: String,
}

impl RedisHotStore {
    /// Connect without a key prefix.
    pub async fn new(connection_string: &str) -> Result<Self, StorageError> {
        Self::with_prefix(connection_string, None).await
    }

    /// Connect with an optional key prefix, for sharing an instance with
    /// other applications.
    pub async fn with_prefix(connection_string: &str, prefix: Option<&str>) -> Result<Self, StorageError> {
        let client = Client::open(connection_string)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let connection = retry("redis_connect", &RetryConfig::startup(), || async {
            ConnectionManager::new(client.clone()).await
        })
        .await
        .map_err(|e: RedisError| StorageError::Backend(e.to_string()))?;

        info!(prefix = prefix.unwrap_or(""), "Redis hot store connected");

        Ok(Self {
            connection,
            prefix: prefix.unwrap_or("").to_string(),
        })
    }

    #[inline]
    fn prefixed_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}{}", self.prefix, key)
        }
    }

    #[inline]
    fn strip_prefix<'a>(&self, key: &'a str) -> &'a str {
        if self.prefix.is_empty() {
            key
        } else {
            key.strip_prefix(&self.prefix).unwrap_or(key)
        }
    }

    /// Get the configured prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

fn map_redis_error(err: RedisError) -> StorageError {
    if err.code() == Some("OOM") || err.to_string().contains("OOM") {
        StorageError::CapacityExceeded(err.to_string())
    } else {
        StorageError::Backend(err.to_string())
    }
}

#[async_trait]
impl KvStore for RedisHotStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.connection.clone();
        conn.get::<_, Option<String>>(self.prefixed_key(key))
            .await
            .map_err(map_redis_error)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(self.prefixed_key(key), value)
            .await
            .map_err(map_redis_error)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(self.prefixed_key(key))
            .await
            .map_err(map_redis_error)
    }

    async fn list_keys(&self) -> Result<Vec<String>, StorageError> {
        let mut conn = self.connection.clone();
        let pattern = format!("{}*", self.prefix);
        let keys: Vec<String> = conn.keys(pattern).await.map_err(map_redis_error)?;
        Ok(keys.iter().map(|k| self.strip_prefix(k).to_string()).collect())
    }
}
