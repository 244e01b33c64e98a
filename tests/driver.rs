//! Integration tests for the session driver
//!
//! Uses a scripted in-memory engine to exercise the single-session
//! invariant, the submit-while-live cancel toggle, and queue draining with
//! its persisted snapshot.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use yard_fetcher::app::engine::{CancelFlag, EngineOptions, MediaMetadata};
use yard_fetcher::app::models::{OptionSnapshot, SessionEvent};
use yard_fetcher::app::{QueueStore, SessionDriver, Submission};
use yard_fetcher::config::SettingsStore;
use yard_fetcher::errors::{EngineError, EngineResult};
use yard_fetcher::{FetchEngine, Quality};

/// Per-URL behavior for the scripted engine
#[derive(Debug, Clone, Copy, PartialEq)]
enum Script {
    Succeed,
    Fail,
    WaitForCancel,
}

/// In-memory engine that follows a per-URL script and records transfer order
struct ScriptedEngine {
    scripts: HashMap<String, Script>,
    transfers: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    fn new(scripts: &[(&str, Script)]) -> Self {
        Self {
            scripts: scripts
                .iter()
                .map(|(url, script)| (url.to_string(), *script))
                .collect(),
            transfers: Mutex::new(Vec::new()),
        }
    }

    fn transfer_order(&self) -> Vec<String> {
        self.transfers.lock().unwrap().clone()
    }

    fn metadata(title: &str) -> MediaMetadata {
        MediaMetadata {
            title: title.to_string(),
            duration_seconds: 60,
            is_live: false,
            formats: Vec::new(),
            estimated_size_bytes: None,
        }
    }
}

#[async_trait]
impl FetchEngine for ScriptedEngine {
    async fn probe(&self, url: &str, _options: &EngineOptions) -> EngineResult<MediaMetadata> {
        Ok(Self::metadata(url))
    }

    async fn transfer(
        &self,
        url: &str,
        _options: &EngineOptions,
        _events: mpsc::Sender<SessionEvent>,
        cancel: CancelFlag,
    ) -> EngineResult<MediaMetadata> {
        self.transfers.lock().unwrap().push(url.to_string());
        match self.scripts.get(url).copied().unwrap_or(Script::Succeed) {
            Script::Succeed => Ok(Self::metadata(url)),
            Script::Fail => Err(EngineError::Failed {
                message: "scripted failure".to_string(),
            }),
            Script::WaitForCancel => loop {
                if cancel.is_cancelled() {
                    return Err(EngineError::Cancelled);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            },
        }
    }
}

fn options_in(dir: &Path) -> OptionSnapshot {
    OptionSnapshot {
        dest_dir: dir.to_path_buf(),
        ..OptionSnapshot::default()
    }
}

fn driver_with(
    engine: Arc<ScriptedEngine>,
    queue_path: &Path,
    settings: Option<SettingsStore>,
) -> SessionDriver {
    let (events_tx, mut events_rx) = mpsc::channel(64);
    // Keep the channel drained so slow consumers never block the session
    tokio::spawn(async move { while events_rx.recv().await.is_some() {} });
    SessionDriver::new(engine, QueueStore::new(queue_path), settings, events_tx)
}

#[tokio::test]
async fn submit_starts_then_toggles_to_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(ScriptedEngine::new(&[(
        "https://t.example/slow",
        Script::WaitForCancel,
    )]));
    let mut driver = driver_with(engine, &dir.path().join("queue.json"), None);

    let first = driver.submit("https://t.example/slow", options_in(dir.path()));
    assert_eq!(first, Submission::Started);
    assert!(driver.is_active());
    assert_eq!(driver.active_url(), Some("https://t.example/slow"));

    // A second submission while live is a cancel request, not a new session
    let second = driver.submit("https://t.example/other", options_in(dir.path()));
    assert_eq!(second, Submission::CancelRequested);

    let report = driver.wait_active().await.unwrap();
    assert!(report.is_cancelled());
    assert!(!driver.is_active());
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(ScriptedEngine::new(&[(
        "https://t.example/slow",
        Script::WaitForCancel,
    )]));
    let mut driver = driver_with(engine, &dir.path().join("queue.json"), None);

    driver.submit("https://t.example/slow", options_in(dir.path()));
    assert!(driver.cancel_active());
    assert!(driver.cancel_active());

    let report = driver.wait_active().await.unwrap();
    assert!(report.is_cancelled());
    // Nothing live any more, so a further cancel is a no-op
    assert!(!driver.cancel_active());
}

#[tokio::test]
async fn queue_drains_in_order_and_snapshot_shrinks() {
    let dir = tempfile::tempdir().unwrap();
    let queue_path = dir.path().join("queue.json");
    let engine = Arc::new(ScriptedEngine::new(&[]));
    let mut driver = driver_with(engine.clone(), &queue_path, None);

    assert!(driver.enqueue("https://t.example/b", options_in(dir.path())));
    assert!(driver.enqueue("https://t.example/c", options_in(dir.path())));
    assert_eq!(driver.queue().len(), 2);

    driver.submit("https://t.example/a", options_in(dir.path()));
    let reports = driver.run_to_completion().await;

    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.success));
    assert_eq!(
        engine.transfer_order(),
        vec![
            "https://t.example/a",
            "https://t.example/b",
            "https://t.example/c"
        ]
    );

    // The persisted snapshot shrank with every dequeue
    assert!(QueueStore::new(&queue_path).load().is_empty());
}

#[tokio::test]
async fn failure_does_not_stop_the_drain() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(ScriptedEngine::new(&[("https://t.example/bad", Script::Fail)]));
    let mut driver = driver_with(engine.clone(), &dir.path().join("queue.json"), None);

    driver.enqueue("https://t.example/good", options_in(dir.path()));
    driver.submit("https://t.example/bad", options_in(dir.path()));
    let reports = driver.run_to_completion().await;

    assert_eq!(reports.len(), 2);
    assert!(!reports[0].success);
    assert_eq!(reports[0].error.as_deref(), Some("scripted failure"));
    assert!(reports[1].success);
}

#[tokio::test]
async fn cancel_resolves_the_session_and_drains_to_the_next() {
    let dir = tempfile::tempdir().unwrap();
    let queue_path = dir.path().join("queue.json");
    let engine = Arc::new(ScriptedEngine::new(&[(
        "https://t.example/slow",
        Script::WaitForCancel,
    )]));
    let mut driver = driver_with(engine.clone(), &queue_path, None);

    driver.enqueue("https://t.example/later", options_in(dir.path()));
    driver.submit("https://t.example/slow", options_in(dir.path()));
    driver.cancel_active();

    let report = driver.wait_active().await.unwrap();
    assert!(report.is_cancelled());

    // The queued request took over immediately and the snapshot shrank
    assert!(driver.is_active());
    assert_eq!(driver.active_url(), Some("https://t.example/later"));
    assert!(QueueStore::new(&queue_path).load().is_empty());

    let report = driver.wait_active().await.unwrap();
    assert!(report.success);
    assert!(!driver.is_active());
    assert_eq!(
        engine.transfer_order(),
        vec!["https://t.example/slow", "https://t.example/later"]
    );
}

#[tokio::test]
async fn success_persists_options_as_new_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings_path = dir.path().join("settings.toml");
    let engine = Arc::new(ScriptedEngine::new(&[]));
    let mut driver = driver_with(
        engine,
        &dir.path().join("queue.json"),
        Some(SettingsStore::new(&settings_path)),
    );

    let mut options = options_in(dir.path());
    options.quality = Quality::P720;
    options.audio_only = true;
    options.format = "mp3".to_string();
    driver.submit("https://t.example/a", options.clone());
    let report = driver.wait_active().await.unwrap();
    assert!(report.success);

    let stored = SettingsStore::new(&settings_path).load();
    assert_eq!(stored.quality, Quality::P720);
    assert!(stored.audio_only);
    assert_eq!(stored.format, "mp3");
}

#[tokio::test]
async fn restored_queue_resumes_with_start_next() {
    let dir = tempfile::tempdir().unwrap();
    let queue_path = dir.path().join("queue.json");

    // A previous run left work behind
    {
        let store = QueueStore::new(&queue_path);
        let mut queue = store.load();
        queue.enqueue("https://t.example/leftover", options_in(dir.path()));
        store.save(&queue).unwrap();
    }

    let engine = Arc::new(ScriptedEngine::new(&[]));
    let mut driver = driver_with(engine.clone(), &queue_path, None);
    assert_eq!(driver.queue().len(), 1);

    assert!(driver.start_next());
    let reports = driver.run_to_completion().await;
    assert_eq!(reports.len(), 1);
    assert!(reports[0].success);
    assert_eq!(engine.transfer_order(), vec!["https://t.example/leftover"]);
    assert!(!driver.start_next());
}
