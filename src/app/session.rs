//! Single-transfer session orchestration
//!
//! A [`TransferSession`] owns one download from probe to terminal outcome:
//! validate the URL, prepare the destination, probe metadata, resolve quality
//! fallback, gate on free disk space, run the transfer, and map every ending
//! (success, cancel, failure) to a caller-facing [`TransferReport`]. The
//! session never panics a failure up to the caller; everything terminal
//! becomes a report.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::args;
use crate::app::engine::{CancelFlag, EngineOptions, FetchEngine, MediaMetadata};
use crate::app::format::{build_format_expression, capped_expression, resolve_fallback};
use crate::app::models::{
    OptionSnapshot, ProgressEvent, ProgressPhase, SessionEvent, TransferOutcome, TransferReport,
};
use crate::app::preflight::{check_space, SpaceDecision};
use crate::constants::{engine as engine_consts, session as session_consts};
use crate::errors::{EngineError, SessionError, SessionResult};

/// One download session, from probe to terminal report
pub struct TransferSession {
    engine: Arc<dyn FetchEngine>,
    url: String,
    options: OptionSnapshot,
    events: mpsc::Sender<SessionEvent>,
    cancel: CancelFlag,
}

impl TransferSession {
    /// Create a session for one URL with a frozen option snapshot
    pub fn new(
        engine: Arc<dyn FetchEngine>,
        url: impl Into<String>,
        options: OptionSnapshot,
        events: mpsc::Sender<SessionEvent>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            engine,
            url: url.into(),
            options,
            events,
            cancel,
        }
    }

    /// Run the session to completion and report the outcome
    ///
    /// Cancellation always yields the reserved `Cancelled` report, never a
    /// failure with an engine message.
    pub async fn run(self) -> TransferReport {
        let dest_dir = self.options.dest_dir.clone();
        let outcome = match self.run_inner().await {
            Ok(title) => TransferOutcome::Succeeded { title },
            Err(SessionError::Cancelled) => {
                let removed = cleanup_partials(&dest_dir);
                if removed > 0 {
                    info!("Removed {} partial artifact(s) after cancel", removed);
                }
                TransferOutcome::Cancelled
            }
            Err(e) => {
                warn!("Transfer failed: {}", e);
                TransferOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        outcome.into()
    }

    async fn run_inner(&self) -> SessionResult<String> {
        validate_url(&self.url)?;
        self.prepare_destination()?;

        self.log(format!("Fetching media info for {}", self.url))
            .await;
        let _ = self
            .events
            .send(SessionEvent::Progress(ProgressEvent::phase(
                ProgressPhase::Probing,
            )))
            .await;

        let mut engine_options = self.build_engine_options();

        let metadata = self
            .engine
            .probe(&self.url, &engine_options)
            .await
            .map_err(|e| match e {
                EngineError::Cancelled => SessionError::Cancelled,
                other => SessionError::Probe {
                    message: other.to_string(),
                },
            })?;

        if self.cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }

        self.advise(&metadata).await;
        self.apply_fallback(&metadata, &mut engine_options).await;
        self.gate_on_space(&metadata).await?;

        self.log(format!("Downloading: {}", metadata.title)).await;
        let result = self
            .engine
            .transfer(
                &self.url,
                &engine_options,
                self.events.clone(),
                self.cancel.clone(),
            )
            .await;

        match result {
            Ok(transferred) => {
                let title = if transferred.title.is_empty() {
                    metadata.title
                } else {
                    transferred.title
                };
                self.log(format!("Finished: {}", title)).await;
                Ok(title)
            }
            Err(EngineError::Cancelled) => Err(SessionError::Cancelled),
            Err(e) => Err(SessionError::Engine(e)),
        }
    }

    fn prepare_destination(&self) -> SessionResult<()> {
        std::fs::create_dir_all(&self.options.dest_dir).map_err(|e| {
            warn!(
                "Cannot create destination {}: {}",
                self.options.dest_dir.display(),
                e
            );
            SessionError::Destination {
                path: self.options.dest_dir.clone(),
            }
        })
    }

    fn build_engine_options(&self) -> EngineOptions {
        let expression = build_format_expression(self.options.audio_only, self.options.quality);
        let mut engine_options = EngineOptions::from_snapshot(&self.options, expression);

        // Pass cookies through only when the file is actually there
        if let Some(cookies) = &self.options.cookies_file {
            if cookies.is_file() {
                engine_options.cookies_file = Some(cookies.clone());
            } else {
                warn!(
                    "Cookies file {} does not exist, continuing without it",
                    cookies.display()
                );
            }
        }

        if let Some(js_dir) = crate::app::engine::ytdlp::find_js_runtime_dir() {
            debug!("JS runtime found in {}", js_dir.display());
            engine_options.js_runtime_dir = Some(js_dir);
        } else {
            debug!(
                "No {} binary on PATH, some extractors may be slower",
                engine_consts::JS_RUNTIME_BINARY
            );
        }

        if let Some(raw) = &self.options.custom_args {
            let overrides = args::parse(raw);
            if !overrides.is_empty() {
                debug!("Applying {} custom engine override(s)", overrides.len());
                engine_options = engine_options.with_overrides(overrides);
            }
        }

        engine_options
    }

    /// Advisory warnings surfaced before the transfer commits
    async fn advise(&self, metadata: &MediaMetadata) {
        if metadata.is_live {
            self.warn_log(
                "This is a live broadcast; the download will follow the stream until it ends"
                    .to_string(),
            )
            .await;
        }
        if metadata.duration_seconds > session_consts::LONG_DURATION_WARNING.as_secs() {
            let hours = metadata.duration_seconds as f64 / 3600.0;
            let mut message = format!(
                "Long media detected ({:.1} h); this transfer may take a while",
                hours
            );
            if self.options.compat_mode && !self.options.audio_only {
                message.push_str(". Compatibility re-encoding will add significant time");
            }
            self.warn_log(message).await;
        }
    }

    /// Rewrite the selection expression when the requested height is not on
    /// offer for this resource
    async fn apply_fallback(&self, metadata: &MediaMetadata, engine_options: &mut EngineOptions) {
        if self.options.audio_only {
            return;
        }
        let requested = match self.options.quality.height() {
            Some(h) => h,
            None => return,
        };
        let heights = metadata.available_heights();
        if heights.is_empty() || heights.contains(&requested) {
            return;
        }
        if let Some(substitute) = resolve_fallback(requested, &heights) {
            engine_options.format_expression = capped_expression(substitute);
            self.log(format!(
                "{}p not available, downloading {}p instead",
                requested, substitute
            ))
            .await;
        }
    }

    async fn gate_on_space(&self, metadata: &MediaMetadata) -> SessionResult<()> {
        let estimate = metadata.estimated_size_bytes.unwrap_or(0);
        match check_space(estimate, &self.options.dest_dir) {
            SpaceDecision::Proceed => Ok(()),
            SpaceDecision::ProceedWithWarning {
                required_gb,
                free_gb,
            } => {
                self.log(format!(
                    "Low disk space: ~{:.1} GB needed, {:.1} GB free",
                    required_gb, free_gb
                ))
                .await;
                Ok(())
            }
            SpaceDecision::Abort {
                required_gb,
                free_gb,
            } => Err(SessionError::InsufficientSpace {
                required_gb,
                free_gb,
            }),
        }
    }

    async fn log(&self, message: String) {
        info!("{}", message);
        let _ = self.events.send(SessionEvent::Log(message)).await;
    }

    async fn warn_log(&self, message: String) {
        warn!("{}", message);
        let _ = self.events.send(SessionEvent::Log(message)).await;
    }
}

/// Reject anything that is not an absolute URL before it reaches the engine
pub fn validate_url(url: &str) -> SessionResult<()> {
    match url::Url::parse(url) {
        Ok(parsed) if !parsed.cannot_be_a_base() => Ok(()),
        _ => Err(SessionError::InvalidUrl {
            url: url.to_string(),
        }),
    }
}

/// Remove leftover partial-download artifacts from a cancelled transfer
///
/// Best effort: unreadable entries are skipped. Returns the number of files
/// removed.
pub fn cleanup_partials(dest: &Path) -> usize {
    let entries = match std::fs::read_dir(dest) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if engine_consts::PARTIAL_SUFFIXES
            .iter()
            .any(|s| name.ends_with(s))
            && std::fs::remove_file(&path).is_ok()
        {
            debug!("Removed partial artifact {}", path.display());
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::engine::StreamFormat;
    use crate::errors::EngineResult;
    use async_trait::async_trait;

    /// Scripted engine: fixed probe metadata and a fixed transfer result
    struct ScriptedEngine {
        metadata: MediaMetadata,
        transfer_result: fn(&CancelFlag) -> EngineResult<MediaMetadata>,
    }

    #[async_trait]
    impl FetchEngine for ScriptedEngine {
        async fn probe(&self, _url: &str, _opts: &EngineOptions) -> EngineResult<MediaMetadata> {
            Ok(self.metadata.clone())
        }

        async fn transfer(
            &self,
            _url: &str,
            _opts: &EngineOptions,
            _events: mpsc::Sender<SessionEvent>,
            cancel: CancelFlag,
        ) -> EngineResult<MediaMetadata> {
            (self.transfer_result)(&cancel)
        }
    }

    fn metadata_with_heights(heights: &[u32]) -> MediaMetadata {
        MediaMetadata {
            title: "Sample".into(),
            duration_seconds: 60,
            is_live: false,
            formats: heights
                .iter()
                .map(|h| StreamFormat { height: Some(*h) })
                .collect(),
            estimated_size_bytes: None,
        }
    }

    fn options_in(dir: &Path) -> OptionSnapshot {
        OptionSnapshot {
            dest_dir: dir.to_path_buf(),
            ..OptionSnapshot::default()
        }
    }

    fn session_with(
        engine: ScriptedEngine,
        url: &str,
        options: OptionSnapshot,
    ) -> (TransferSession, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let session = TransferSession::new(Arc::new(engine), url, options, tx, CancelFlag::new());
        (session, rx)
    }

    fn drain_logs(rx: &mut mpsc::Receiver<SessionEvent>) -> Vec<String> {
        let mut logs = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::Log(line) = event {
                logs.push(line);
            }
        }
        logs
    }

    #[tokio::test]
    async fn successful_transfer_reports_title() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            metadata: metadata_with_heights(&[1080, 720]),
            transfer_result: |_| Ok(metadata_with_heights(&[])),
        };
        let (session, _rx) = session_with(engine, "https://example.com/watch?v=1", options_in(dir.path()));
        let report = session.run().await;
        assert!(report.success);
        assert_eq!(report.title.as_deref(), Some("Sample"));
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_before_probe() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            metadata: metadata_with_heights(&[]),
            transfer_result: |_| Ok(metadata_with_heights(&[])),
        };
        let (session, _rx) = session_with(engine, "not a url", options_in(dir.path()));
        let report = session.run().await;
        assert!(!report.success);
        assert!(report.error.unwrap().contains("Invalid URL"));
    }

    #[tokio::test]
    async fn cancellation_maps_to_reserved_report() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            metadata: metadata_with_heights(&[720]),
            transfer_result: |_| Err(EngineError::Cancelled),
        };
        let (session, _rx) = session_with(engine, "https://example.com/v", options_in(dir.path()));
        let report = session.run().await;
        assert!(!report.success);
        assert!(report.is_cancelled());
    }

    #[tokio::test]
    async fn engine_failure_surfaces_message() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            metadata: metadata_with_heights(&[720]),
            transfer_result: |_| {
                Err(EngineError::Failed {
                    message: "ERROR: no formats".into(),
                })
            },
        };
        let (session, _rx) = session_with(engine, "https://example.com/v", options_in(dir.path()));
        let report = session.run().await;
        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("ERROR: no formats"));
    }

    #[tokio::test]
    async fn unavailable_height_logs_substitution() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            metadata: metadata_with_heights(&[720, 480]),
            transfer_result: |_| Ok(metadata_with_heights(&[])),
        };
        let mut options = options_in(dir.path());
        options.quality = crate::app::models::Quality::P1080;
        let (session, mut rx) = session_with(engine, "https://example.com/v", options);
        let report = session.run().await;
        assert!(report.success);
        let logs = drain_logs(&mut rx);
        assert!(logs
            .iter()
            .any(|l| l.contains("1080p not available") && l.contains("720p")));
    }

    #[tokio::test]
    async fn live_media_gets_advisory() {
        let dir = tempfile::tempdir().unwrap();
        let mut metadata = metadata_with_heights(&[720]);
        metadata.is_live = true;
        let engine = ScriptedEngine {
            metadata,
            transfer_result: |_| Ok(metadata_with_heights(&[])),
        };
        let (session, mut rx) = session_with(engine, "https://example.com/live", options_in(dir.path()));
        session.run().await;
        let logs = drain_logs(&mut rx);
        assert!(logs.iter().any(|l| l.contains("live broadcast")));
    }

    #[test]
    fn url_validation() {
        assert!(validate_url("https://example.com/watch?v=abc").is_ok());
        assert!(validate_url("http://host/path").is_ok());
        assert!(validate_url("example.com/watch").is_err());
        assert!(validate_url("").is_err());
        assert!(validate_url("   ").is_err());
    }

    #[test]
    fn partial_cleanup_only_touches_partials() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4.part"), b"x").unwrap();
        std::fs::write(dir.path().join("clip.mp4.ytdl"), b"x").unwrap();
        std::fs::write(dir.path().join("keep.mp4"), b"x").unwrap();
        assert_eq!(cleanup_partials(dir.path()), 2);
        assert!(dir.path().join("keep.mp4").exists());
        assert!(!dir.path().join("clip.mp4.part").exists());
    }
}
