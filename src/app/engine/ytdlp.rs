//! yt-dlp subprocess adapter
//!
//! Implements [`FetchEngine`] by driving the yt-dlp binary: a `--dump-json`
//! metadata probe under a bounded timeout, and a line-streamed transfer whose
//! progress output is parsed into typed events. Cancellation is observed at
//! each output line; on cancel the child is killed and the distinguished
//! cancellation error is returned so the session can map it to the
//! `Cancelled` outcome.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{CancelFlag, EngineOptions, FetchEngine, MediaMetadata, StreamFormat};
use crate::app::models::{
    PostProcessEvent, PostProcessPhase, ProgressEvent, ProgressPhase, SessionEvent,
};
use crate::constants::{engine as engine_consts, session};
use crate::errors::{EngineError, EngineResult};

lazy_static! {
    /// Matches `[download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59`
    static ref PROGRESS_RE: Regex = Regex::new(
        r"\[download\]\s+(\d+\.?\d*)%(?:\s+of\s+~?\s*\S+)?(?:\s+at\s+(\S+))?(?:\s+ETA\s+(\S+))?"
    )
    .unwrap();
    /// Matches a post-processor tag such as `[Merger]` or `[ExtractAudio]`
    static ref POSTPROCESS_RE: Regex =
        Regex::new(r"^\[(Merger|ExtractAudio|VideoConvertor|VideoRemuxer|Metadata)\]\s*(.*)").unwrap();
    /// Captures the destination path a processor is writing
    static ref DESTINATION_RE: Regex = Regex::new(r"Destination:\s+(.+)").unwrap();
}

/// Parse one engine output line into a progress event
///
/// Percent defaults to 0 when the label cannot be parsed; values are clamped
/// into `[0, 1]`. Returns the `Finished` phase once the engine reports 100%.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let caps = PROGRESS_RE.captures(line)?;
    let percent = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .unwrap_or(0.0)
        / 100.0;
    let percent = percent.clamp(0.0, 1.0);
    let phase = if percent >= 1.0 {
        ProgressPhase::Finished
    } else {
        ProgressPhase::Downloading
    };
    Some(ProgressEvent {
        phase,
        percent: Some(percent),
        speed: caps.get(2).map(|m| m.as_str().to_string()),
        eta: caps.get(3).map(|m| m.as_str().to_string()),
    })
}

/// Parse one engine output line into a post-process event
pub fn parse_postprocess_line(line: &str) -> Option<PostProcessEvent> {
    let caps = POSTPROCESS_RE.captures(line)?;
    let processor = caps.get(1)?.as_str().to_string();
    let rest = caps.get(2).map(|m| m.as_str()).unwrap_or("");

    if let Some(dest) = DESTINATION_RE.captures(rest) {
        let file_name = Path::new(dest.get(1)?.as_str().trim())
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        return Some(PostProcessEvent {
            phase: PostProcessPhase::Processing,
            processor,
            file_name,
        });
    }

    Some(PostProcessEvent {
        phase: PostProcessPhase::Started,
        processor,
        file_name: None,
    })
}

/// Locate the yt-dlp binary in common install locations
pub fn find_binary() -> String {
    for candidate in engine_consts::BINARY_CANDIDATES {
        if Path::new(candidate).is_absolute() && Path::new(candidate).exists() {
            return candidate.to_string();
        }
    }
    // Hope it is on PATH
    "yt-dlp".to_string()
}

/// Discover the directory of an optional JS interpreter binary
///
/// Checked in the app data directory first, then on PATH. Advisory only;
/// absence is logged by the caller and never blocks a transfer.
pub fn find_js_runtime_dir() -> Option<PathBuf> {
    let bundled = crate::config::app_data_dir().join("bin");
    if bundled.join(engine_consts::JS_RUNTIME_BINARY).is_file() {
        return Some(bundled);
    }
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join(engine_consts::JS_RUNTIME_BINARY);
        if candidate.is_file() {
            return Some(dir);
        }
    }
    None
}

/// Production fetch engine driving a yt-dlp subprocess
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    binary: String,
}

impl YtDlpEngine {
    /// Create an engine using the first discoverable binary
    pub fn new() -> Self {
        Self {
            binary: find_binary(),
        }
    }

    /// Create an engine for an explicit binary path
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn base_command(&self, options: &EngineOptions) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.stdin(Stdio::null());
        // Extend the child PATH with the JS runtime location when discovered
        if let Some(js_dir) = &options.js_runtime_dir {
            let mut paths = vec![js_dir.clone()];
            if let Some(existing) = std::env::var_os("PATH") {
                paths.extend(std::env::split_paths(&existing));
            }
            if let Ok(joined) = std::env::join_paths(paths) {
                cmd.env("PATH", OsString::from(joined));
            }
        }
        cmd
    }
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Map probe JSON to the metadata contract
fn parse_probe_json(stdout: &[u8]) -> EngineResult<MediaMetadata> {
    let json: serde_json::Value =
        serde_json::from_slice(stdout).map_err(|e| EngineError::Output {
            reason: e.to_string(),
        })?;

    let formats = json["formats"]
        .as_array()
        .map(|fmts| {
            fmts.iter()
                .map(|f| StreamFormat {
                    height: f["height"].as_u64().map(|h| h as u32),
                })
                .collect()
        })
        .unwrap_or_default();

    let estimated_size_bytes = json["filesize"]
        .as_u64()
        .or_else(|| json["filesize_approx"].as_u64());

    Ok(MediaMetadata {
        title: json["title"].as_str().unwrap_or("Unknown").to_string(),
        duration_seconds: json["duration"].as_f64().unwrap_or(0.0) as u64,
        is_live: json["is_live"].as_bool().unwrap_or(false),
        formats,
        estimated_size_bytes,
    })
}

#[async_trait]
impl FetchEngine for YtDlpEngine {
    async fn probe(&self, url: &str, options: &EngineOptions) -> EngineResult<MediaMetadata> {
        let mut cmd = self.base_command(options);
        cmd.arg("--dump-json")
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg("--skip-download");
        if let Some(cookies) = &options.cookies_file {
            cmd.arg("--cookies").arg(cookies);
        }
        cmd.arg(url);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        debug!("Probing {} with {}", url, self.binary);
        let output = tokio::time::timeout(session::PROBE_TIMEOUT, cmd.output())
            .await
            .map_err(|_| EngineError::ProbeTimeout {
                seconds: session::PROBE_TIMEOUT.as_secs(),
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::BinaryNotFound
                } else {
                    EngineError::Spawn(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("probe failed")
                .to_string();
            return Err(EngineError::Failed { message });
        }

        parse_probe_json(&output.stdout)
    }

    async fn transfer(
        &self,
        url: &str,
        options: &EngineOptions,
        events: mpsc::Sender<SessionEvent>,
        cancel: CancelFlag,
    ) -> EngineResult<MediaMetadata> {
        let mut cmd = self.base_command(options);
        cmd.args(options.transfer_args());
        cmd.arg(url);
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!("Starting transfer for {}", url);
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::BinaryNotFound
            } else {
                EngineError::Spawn(e)
            }
        })?;

        let stdout = child.stdout.take().ok_or_else(|| EngineError::Output {
            reason: "no stdout handle".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| EngineError::Output {
            reason: "no stderr handle".to_string(),
        })?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                buf.push_str(&line);
                buf.push('\n');
            }
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut finished_sent = false;
        let mut last_processor: Option<String> = None;
        let mut output_title: Option<String> = None;

        while let Ok(Some(line)) = lines.next_line().await {
            // Cancellation is observed here, at the progress tick, and
            // nowhere else
            if cancel.is_cancelled() {
                let _ = child.kill().await;
                let _ = stderr_task.await;
                return Err(EngineError::Cancelled);
            }

            if let Some(event) = parse_progress_line(&line) {
                // Never fabricate progress past the finished mark
                if event.phase == ProgressPhase::Finished {
                    if !finished_sent {
                        finished_sent = true;
                        let _ = events.send(SessionEvent::Progress(event)).await;
                    }
                } else if !finished_sent {
                    let _ = events.send(SessionEvent::Progress(event)).await;
                }
                continue;
            }

            if let Some(event) = parse_postprocess_line(&line) {
                last_processor = Some(event.processor.clone());
                if let Some(name) = &event.file_name {
                    output_title = Path::new(name)
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string());
                }
                let _ = events.send(SessionEvent::PostProcess(event)).await;
                continue;
            }

            if let Some(caps) = DESTINATION_RE.captures(&line) {
                if let Some(dest) = caps.get(1) {
                    output_title = Path::new(dest.as_str().trim())
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string());
                }
            }
        }

        let status = child.wait().await.map_err(EngineError::Spawn)?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        if !status.success() {
            let message = stderr_text
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("transfer failed")
                .to_string();
            warn!("Engine exited with failure: {}", message);
            return Err(EngineError::Failed { message });
        }

        if let Some(processor) = last_processor {
            let _ = events
                .send(SessionEvent::PostProcess(PostProcessEvent {
                    phase: PostProcessPhase::Finished,
                    processor,
                    file_name: None,
                }))
                .await;
        }

        Ok(MediaMetadata {
            title: output_title.unwrap_or_default(),
            duration_seconds: 0,
            is_live: false,
            formats: Vec::new(),
            estimated_size_bytes: None,
        })
    }
}
