// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic hybrid-sync usage example.
//!
//! Demonstrates:
//! 1. Opening a SQLite durable store
//! 2. Binding a remote backend through `StudyStore`
//! 3. Saving while online
//! 4. Losing the network: writes are cached and queued
//! 5. Reading offline from the cache
//! 6. Reconnecting and replaying the queue
//! 7. Displaying metrics and shutting down
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use parking_lot::Mutex;
use hybrid_sync::storage::sqlite::SqliteStore;
use hybrid_sync::{
    Flashcard, HybridSync, HybridSyncConfig, LogicNode, RemoteBackend, RemoteError, StudySession,
    StudyStore, UserSettings,
};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

/// Pretend server with a network switch.
#[derive(Default)]
struct DemoRemote {
    offline: AtomicBool,
    flashcards: Mutex<Vec<Flashcard>>,
    settings: Mutex<UserSettings>,
}

impl DemoRemote {
    fn reachable(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Unavailable("network unreachable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteBackend for DemoRemote {
    async fn fetch_flashcards(&self) -> Result<Vec<Flashcard>, RemoteError> {
        self.reachable()?;
        Ok(self.flashcards.lock().clone())
    }
    async fn save_flashcards(&self, cards: Vec<Flashcard>) -> Result<(), RemoteError> {
        self.reachable()?;
        *self.flashcards.lock() = cards;
        Ok(())
    }
    async fn fetch_sessions(&self) -> Result<Vec<StudySession>, RemoteError> {
        self.reachable()?;
        Ok(Vec::new())
    }
    async fn save_sessions(&self, _sessions: Vec<StudySession>) -> Result<(), RemoteError> {
        self.reachable()
    }
    async fn fetch_settings(&self) -> Result<UserSettings, RemoteError> {
        self.reachable()?;
        Ok(self.settings.lock().clone())
    }
    async fn save_settings(&self, settings: UserSettings) -> Result<(), RemoteError> {
        self.reachable()?;
        *self.settings.lock() = settings;
        Ok(())
    }
    async fn fetch_logic_nodes(&self) -> Result<Vec<LogicNode>, RemoteError> {
        self.reachable()?;
        Ok(Vec::new())
    }
    async fn save_logic_nodes(&self, _nodes: Vec<LogicNode>) -> Result<(), RemoteError> {
        self.reachable()
    }
    async fn clear_all(&self) -> Result<(), RemoteError> {
        self.reachable()?;
        self.flashcards.lock().clear();
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hybrid_sync=info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║           hybrid-sync: Basic Usage Example                    ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Durable store + orchestrator
    // ─────────────────────────────────────────────────────────────────────────
    let db_path = std::env::temp_dir().join("hybrid_sync_demo.db");
    println!("📦 Opening durable store at {}", db_path.display());
    let durable = Arc::new(SqliteStore::open(&db_path).await?);

    let sync = Arc::new(
        HybridSync::builder(HybridSyncConfig::default())
            .durable(durable.clone())
            .build()
            .await,
    );

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Domain accessors
    // ─────────────────────────────────────────────────────────────────────────
    let remote = Arc::new(DemoRemote::default());
    let store = StudyStore::new(sync.clone(), remote.clone());

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Online save
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📝 Saving flashcards while online...");
    let cards = vec![
        Flashcard::new("c1", "Capital of France?", "Paris"),
        Flashcard::new("c2", "2^10", "1024"),
    ];
    let outcome = store.save_flashcards(cards).await;
    println!("   └─ {}", outcome);

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Offline save
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📴 Network goes away...");
    remote.offline.store(true, Ordering::SeqCst);

    let mut settings = store.get_settings().await;
    settings.theme = "dark".into();
    let outcome = store.save_settings(settings).await;
    println!("   └─ save_settings: {} (pending sync: {})", outcome, outcome.is_pending());

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Offline reads
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🔍 Reading while offline...");
    println!("   ├─ flashcards: {} cards (from cache)", store.get_flashcards().await.len());
    println!("   └─ theme: {}", store.get_settings().await.theme);

    let info = store.storage_info();
    println!("\n📊 Storage info: {}", serde_json::to_string(&info)?);

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Reconnect and replay
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📶 Network is back, syncing...");
    remote.offline.store(false, Ordering::SeqCst);
    let report = store.sync_now().await;
    println!(
        "   └─ synced={} failed={} dropped={} skipped={}",
        report.synced, report.failed, report.dropped, report.skipped
    );
    println!("   └─ remote theme is now: {}", remote.settings.lock().theme);

    // ─────────────────────────────────────────────────────────────────────────
    // 7. Metrics and shutdown
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📈 Metrics:");
    dump_metrics(&snapshotter);

    println!("\n🛑 Shutting down...");
    sync.shutdown().await;
    durable.close().await;
    println!("✅ Done\n");

    Ok(())
}

fn dump_metrics(snapshotter: &Snapshotter) {
    let snapshot = snapshotter.snapshot();

    let mut counters: Vec<_> = vec![];
    let mut gauges: Vec<_> = vec![];
    let mut histograms: Vec<_> = vec![];

    for (composite_key, _, _, value) in snapshot.into_vec() {
        let (_, key) = composite_key.into_parts();
        let name = key.name();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };

        match value {
            DebugValue::Counter(v) => counters.push((name.to_string(), label_str, v)),
            DebugValue::Gauge(v) => gauges.push((name.to_string(), label_str, v.into_inner())),
            DebugValue::Histogram(samples) => {
                let count = samples.len();
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                histograms.push((name.to_string(), label_str, count, sum));
            }
        }
    }

    counters.sort_by(|a, b| a.0.cmp(&b.0));
    gauges.sort_by(|a, b| a.0.cmp(&b.0));
    histograms.sort_by(|a, b| a.0.cmp(&b.0));

    if !counters.is_empty() {
        println!("   ┌─ Counters (cumulative)");
        for (name, labels, value) in &counters {
            println!("   │  └─ {}{} = {}", name, labels, value);
        }
    }

    if !gauges.is_empty() {
        println!("   ├─ Gauges (current value)");
        for (name, labels, value) in &gauges {
            println!("   │  └─ {}{} = {:.2}", name, labels, value);
        }
    }

    if !histograms.is_empty() {
        println!("   └─ Histograms (distributions)");
        for (name, labels, count, sum) in &histograms {
            println!("   │  └─ {}{} count={} sum={:.4}s", name, labels, count, sum);
        }
    }

    if counters.is_empty() && gauges.is_empty() && histograms.is_empty() {
        println!("   └─ (no metrics recorded)");
    }
}
