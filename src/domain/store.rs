// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::models::{Flashcard, LogicNode, StorageKey, StudySession, UserSettings};
use crate::coordinator::{HybridSync, StorageInfo, SyncReport, WriteOutcome};
use crate::remote::RemoteBackend;

/// Domain accessors for one user's study data.
///
/// Every getter is remote-first with cache and default fallback; every
/// setter is remote-first with cache-and-queue fallback. Neither ever
/// returns an error.
///
/// # Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use hybrid_sync::{HybridSync, HybridSyncConfig, RemoteBackend, StudyStore};
/// # async fn example<B: RemoteBackend>(backend: Arc<B>) {
/// let sync = Arc::new(HybridSync::builder(HybridSyncConfig::default()).build().await);
/// let store = StudyStore::new(sync, backend);
///
/// let mut settings = store.get_settings().await;
/// settings.theme = "dark".into();
/// if store.save_settings(settings).await.is_pending() {
///     println!("saved locally, will sync when back online");
/// }
/// # }
/// ```
pub struct StudyStore<B: RemoteBackend> {
    sync: Arc<HybridSync>,
    backend: Arc<B>,
}

impl<B: RemoteBackend> StudyStore<B> {
    /// Bind `backend` to `sync`: registers a replay handler per domain and
    /// uses the settings fetch as the connectivity probe.
    pub fn new(sync: Arc<HybridSync>, backend: Arc<B>) -> Self {
        let b = backend.clone();
        sync.register_domain(StorageKey::Flashcards.as_str(), move |cards: Vec<Flashcard>| {
            let b = b.clone();
            async move { b.save_flashcards(cards).await }
        });

        let b = backend.clone();
        sync.register_domain(StorageKey::Sessions.as_str(), move |sessions: Vec<StudySession>| {
            let b = b.clone();
            async move { b.save_sessions(sessions).await }
        });

        let b = backend.clone();
        sync.register_domain(StorageKey::Settings.as_str(), move |settings: UserSettings| {
            let b = b.clone();
            async move { b.save_settings(settings).await }
        });

        let b = backend.clone();
        sync.register_domain(StorageKey::LogicNodes.as_str(), move |nodes: Vec<LogicNode>| {
            let b = b.clone();
            async move { b.save_logic_nodes(nodes).await }
        });

        let b = backend.clone();
        sync.set_connectivity_probe(move || {
            let b = b.clone();
            async move { b.fetch_settings().await.map(|_| ()) }
        });

        Self { sync, backend }
    }

    #[must_use]
    pub fn sync(&self) -> &Arc<HybridSync> {
        &self.sync
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Flashcards
    // ═══════════════════════════════════════════════════════════════════════════

    pub async fn get_flashcards(&self) -> Vec<Flashcard> {
        let b = self.backend.clone();
        self.sync
            .hybrid_get(move || async move { b.fetch_flashcards().await }, StorageKey::Flashcards.as_str(), Vec::new())
            .await
    }

    pub async fn save_flashcards(&self, cards: Vec<Flashcard>) -> WriteOutcome {
        let b = self.backend.clone();
        self.sync
            .hybrid_set(move |cards| async move { b.save_flashcards(cards).await }, StorageKey::Flashcards.as_str(), cards)
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Sessions
    // ═══════════════════════════════════════════════════════════════════════════

    pub async fn get_sessions(&self) -> Vec<StudySession> {
        let b = self.backend.clone();
        self.sync
            .hybrid_get(move || async move { b.fetch_sessions().await }, StorageKey::Sessions.as_str(), Vec::new())
            .await
    }

    pub async fn save_sessions(&self, sessions: Vec<StudySession>) -> WriteOutcome {
        let b = self.backend.clone();
        self.sync
            .hybrid_set(move |s| async move { b.save_sessions(s).await }, StorageKey::Sessions.as_str(), sessions)
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Settings
    // ═══════════════════════════════════════════════════════════════════════════

    pub async fn get_settings(&self) -> UserSettings {
        let b = self.backend.clone();
        self.sync
            .hybrid_get(move || async move { b.fetch_settings().await }, StorageKey::Settings.as_str(), UserSettings::default())
            .await
    }

    pub async fn save_settings(&self, settings: UserSettings) -> WriteOutcome {
        let b = self.backend.clone();
        self.sync
            .hybrid_set(move |s| async move { b.save_settings(s).await }, StorageKey::Settings.as_str(), settings)
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Logic nodes
    // ═══════════════════════════════════════════════════════════════════════════

    pub async fn get_logic_nodes(&self) -> Vec<LogicNode> {
        let b = self.backend.clone();
        self.sync
            .hybrid_get(move || async move { b.fetch_logic_nodes().await }, StorageKey::LogicNodes.as_str(), Vec::new())
            .await
    }

    pub async fn save_logic_nodes(&self, nodes: Vec<LogicNode>) -> WriteOutcome {
        let b = self.backend.clone();
        self.sync
            .hybrid_set(move |n| async move { b.save_logic_nodes(n).await }, StorageKey::LogicNodes.as_str(), nodes)
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Maintenance
    // ═══════════════════════════════════════════════════════════════════════════

    #[must_use]
    pub fn storage_info(&self) -> StorageInfo {
        self.sync.storage_info()
    }

    /// Replay queued writes now.
    pub async fn sync_now(&self) -> SyncReport {
        self.sync.background_sync().await
    }

    /// Wipe the remote store, both cache tiers and the queue.
    ///
    /// Local data is cleared even if the remote wipe fails. Returns `true`
    /// only if every part succeeded.
    #[instrument(skip(self))]
    pub async fn clear_all_data(&self) -> bool {
        let remote_ok = match self.backend.clear_all().await {
            Ok(()) => {
                self.sync.connectivity().record_success();
                true
            }
            Err(e) => {
                self.sync.connectivity().record_failure();
                warn!(error = %e, "Remote wipe failed, clearing local data only");
                false
            }
        };

        let local_ok = self.sync.clear_local().await;
        info!(remote_ok, local_ok, "All data cleared");
        remote_ok && local_ok
    }
}


#[cfg(test)]
mod tests {
    use super::test_backend::FakeRemote;
    use super::*;
    use crate::config::HybridSyncConfig;

    async fn store() -> (StudyStore<FakeRemote>, Arc<FakeRemote>) {
        let sync = Arc::new(HybridSync::builder(HybridSyncConfig::default()).build().await);
        let remote = Arc::new(FakeRemote::default());
        (StudyStore::new(sync, remote.clone()), remote)
    }

    #[tokio::test]
    async fn test_registers_every_domain() {
        let (store, _) = store().await;
        for key in StorageKey::ALL {
            assert!(store.sync().has_handler(key.as_str()), "missing handler for {}", key);
        }
    }

    #[tokio::test]
    async fn test_online_round_trip() {
        let (store, remote) = store().await;
        let cards = vec![Flashcard::new("c1", "capital of France", "Paris")];

        assert_eq!(store.save_flashcards(cards.clone()).await, WriteOutcome::Synced);
        assert_eq!(*remote.flashcards.lock(), cards);
        assert_eq!(store.get_flashcards().await, cards);
    }

    #[tokio::test]
    async fn test_offline_write_replays_when_back_online() {
        let (store, remote) = store().await;
        remote.set_offline(true);

        let settings = UserSettings { theme: "dark".into(), ..UserSettings::default() };
        assert_eq!(store.save_settings(settings.clone()).await, WriteOutcome::Queued);
        assert_eq!(store.get_settings().await, settings);
        assert_eq!(store.storage_info().pending_queue_length, 1);

        // Probe fails while offline
        assert!(store.sync_now().await.is_noop());

        remote.set_offline(false);
        let report = store.sync_now().await;
        assert_eq!(report.synced, 1);
        assert_eq!(*remote.settings.lock(), Some(settings));
        assert!(store.storage_info().is_online);
    }

    #[tokio::test]
    async fn test_offline_read_without_cache_uses_default() {
        let (store, remote) = store().await;
        remote.set_offline(true);

        assert!(store.get_sessions().await.is_empty());
        assert!(store.get_logic_nodes().await.is_empty());
        assert_eq!(store.get_settings().await, UserSettings::default());
        assert!(!store.storage_info().is_online);
    }

    #[tokio::test]
    async fn test_clear_all_data() {
        let (store, remote) = store().await;
        store.save_flashcards(vec![Flashcard::new("c1", "q", "a")]).await;
        remote.set_offline(true);
        store.save_sessions(vec![]).await;

        // Remote wipe fails offline, local wipe still happens
        assert!(!store.clear_all_data().await);
        assert_eq!(store.storage_info().pending_queue_length, 0);
        assert_eq!(store.storage_info().cache_entry_count, 0);

        remote.set_offline(false);
        assert!(store.clear_all_data().await);
        assert!(remote.flashcards.lock().is_empty());
    }
}
