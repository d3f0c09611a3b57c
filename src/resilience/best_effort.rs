// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Catch-log-continue wrapper for side effects that must never fail the
//! caller's operation (cache write-through after a remote read, queue
//! persistence, hot store mirroring).

use std::fmt::Display;
use std::future::Future;
use tracing::warn;

/// Await `fut`; on error log it under `operation` and return `None`.
pub async fn best_effort<F, T, E>(operation: &str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(operation, error = %e, "Best-effort operation failed, continuing");
            crate::metrics::record_operation("engine", operation, "error");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_value_through() {
        let result = best_effort("op", async { Ok::<_, String>(7) }).await;
        assert_eq!(result, Some(7));
    }

    #[tokio::test]
    async fn test_swallows_error() {
        let result = best_effort("op", async { Err::<(), _>("disk full".to_string()) }).await;
        assert!(result.is_none());
    }
}
