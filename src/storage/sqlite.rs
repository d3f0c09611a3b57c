// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQLite-backed durable local store.
//!
//! One table, one row per key:
//! ```sql
//! CREATE TABLE kv_store (
//!   store_key TEXT PRIMARY KEY,
//!   store_value TEXT NOT NULL,
//!   updated_at INTEGER NOT NULL   -- epoch millis, diagnostics only
//! )
//! ```
//!
//! The file is opened in WAL journal mode so readers never block the writer.
//! Values are opaque strings; the cache and queue layers own the JSON format.

use async_trait::async_trait;
use sqlx::{AnyPool, Row, any::AnyPoolOptions};
use std::path::Path;
use std::sync::Once;
use std::time::Duration;
use tracing::{info, debug};

use super::traits::{KvStore, StorageError};
use crate::resilience::retry::{retry, RetryConfig};

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

pub struct SqliteStore {
    pool: AnyPool,
    path: String,
}

impl SqliteStore {
    /// Open (creating if needed) the store at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        install_drivers();

        let path_str = path.as_ref().to_string_lossy().to_string();
        let url = format!("sqlite://{}?mode=rwc", path_str);

        let pool = retry("sqlite_open", &RetryConfig::startup(), || async {
            AnyPoolOptions::new()
                .max_connections(4)
                .acquire_timeout(Duration::from_secs(10))
                .connect(&url)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))
        })
        .await?;

        let store = Self { pool, path: path_str };
        store.enable_wal_mode().await?;
        store.init_schema().await?;

        info!(path = %store.path, "Durable SQLite store opened");
        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &str {
        &self.path
    }

    async fn enable_wal_mode(&self) -> Result<(), StorageError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to enable WAL mode: {}", e)))?;

        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to set synchronous mode: {}", e)))?;

        Ok(())
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        let sql = r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                store_key TEXT PRIMARY KEY,
                store_value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
        "#;

        retry("sqlite_init_schema", &RetryConfig::startup(), || async {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))
        })
        .await?;

        Ok(())
    }

    /// Number of rows (diagnostics).
    pub async fn count(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM kv_store")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let n: i64 = row.try_get("n").unwrap_or(0);
        Ok(n.max(0) as u64)
    }

    /// Close the pool, flushing the WAL.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let key = key.to_string();

        retry("sqlite_get", &RetryConfig::query(), || async {
            let row = sqlx::query("SELECT store_value FROM kv_store WHERE store_key = ?")
                .bind(&key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;

            match row {
                Some(row) => {
                    let value: String = row
                        .try_get::<String, _>("store_value")
                        .or_else(|_| {
                            row.try_get::<Vec<u8>, _>("store_value")
                                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                        })
                        .map_err(|e| StorageError::Corrupt {
                            key: key.clone(),
                            reason: e.to_string(),
                        })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let key = key.to_string();
        let updated_at = now_millis();

        retry("sqlite_set", &RetryConfig::query(), || async {
            sqlx::query(
                "INSERT INTO kv_store (store_key, store_value, updated_at) VALUES (?, ?, ?)
                 ON CONFLICT(store_key) DO UPDATE SET
                    store_value = excluded.store_value,
                    updated_at = excluded.updated_at",
            )
            .bind(&key)
            .bind(&value)
            .bind(updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok::<(), StorageError>(())
        })
        .await?;

        debug!(key = %key, bytes = value.len(), "SQLite set");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let key = key.to_string();
        retry("sqlite_remove", &RetryConfig::query(), || async {
            sqlx::query("DELETE FROM kv_store WHERE store_key = ?")
                .bind(&key)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn list_keys(&self) -> Result<Vec<String>, StorageError> {
        retry("sqlite_list_keys", &RetryConfig::query(), || async {
            let rows = sqlx::query("SELECT store_key FROM kv_store ORDER BY store_key")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;

            Ok(rows
                .iter()
                .filter_map(|row| row.try_get::<String, _>("store_key").ok())
                .collect())
        })
        .await
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        let prefix = prefix.to_string();
        let prefix_chars = prefix.chars().count() as i64;

        retry("sqlite_remove_prefix", &RetryConfig::query(), || async {
            let result = sqlx::query("DELETE FROM kv_store WHERE substr(store_key, 1, ?) = ?")
                .bind(prefix_chars)
                .bind(&prefix)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(result.rows_affected() as usize)
        })
        .await
    }
}
