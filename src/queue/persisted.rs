// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::storage::traits::{KvStore, StorageError};

/// Load a whole-record JSON value, falling back to `T::default()`.
///
/// A record that fails to decode is logged and removed so the next persist
/// starts clean. A store error is logged and also yields the default.
pub(super) async fn load_record<T>(store: &dyn KvStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            warn!(key, error = %e, "Failed to read persisted record, starting empty");
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => {
            debug!(key, "Restored persisted record");
            value
        }
        Err(e) => {
            warn!(key, error = %e, "Corrupt persisted record, discarding");
            crate::metrics::record_corruption("durable");
            if let Err(e) = store.remove(key).await {
                warn!(key, error = %e, "Failed to remove corrupt record");
            }
            T::default()
        }
    }
}

pub(super) async fn save_record<T>(store: &dyn KvStore, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, raw).await
}
