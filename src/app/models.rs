//! Core data types for the download orchestrator
//!
//! This module defines the option snapshot captured at enqueue/start time,
//! queue items, the event types relayed from a running session, and the
//! caller-facing transfer report.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Requested video quality
///
/// Serialized in its display form (`"Best"`, `"1080p"`, ...) to match the
/// persisted settings and queue file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    /// Best available streams, no height cap
    #[default]
    Best,
    /// Capped at 2160p
    P2160,
    /// Capped at 1440p
    P1440,
    /// Capped at 1080p
    P1080,
    /// Capped at 720p
    P720,
    /// Capped at 480p
    P480,
}

impl Quality {
    /// Target height in pixels, `None` for `Best`
    pub fn height(&self) -> Option<u32> {
        match self {
            Quality::Best => None,
            Quality::P2160 => Some(2160),
            Quality::P1440 => Some(1440),
            Quality::P1080 => Some(1080),
            Quality::P720 => Some(720),
            Quality::P480 => Some(480),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Best => write!(f, "Best"),
            other => write!(f, "{}p", other.height().unwrap_or(0)),
        }
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_end_matches('p') {
            "Best" | "best" => Ok(Quality::Best),
            "2160" => Ok(Quality::P2160),
            "1440" => Ok(Quality::P1440),
            "1080" => Ok(Quality::P1080),
            "720" => Ok(Quality::P720),
            "480" => Ok(Quality::P480),
            other => Err(format!("unknown quality: {}", other)),
        }
    }
}

impl Serialize for Quality {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Quality {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Options captured when a download is requested or queued
///
/// A snapshot is frozen at capture time: later changes to defaults never
/// mutate already-queued items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSnapshot {
    /// Extract audio only
    pub audio_only: bool,
    /// Requested video quality (ignored when `audio_only`)
    pub quality: Quality,
    /// Target container/codec name (e.g. "mp4", "mkv"; "mp3" for audio)
    pub format: String,
    /// Download the whole playlist instead of a single item
    pub playlist: bool,
    /// Re-encode to constant frame rate for editing-tool compatibility
    pub compat_mode: bool,
    /// Destination folder for the output
    pub dest_dir: PathBuf,
    /// Optional cookies.txt path passed to the engine when the file exists
    pub cookies_file: Option<PathBuf>,
    /// Free-form engine argument overrides
    pub custom_args: Option<String>,
}

impl Default for OptionSnapshot {
    fn default() -> Self {
        Self {
            audio_only: false,
            quality: Quality::Best,
            format: "mp4".to_string(),
            playlist: false,
            compat_mode: true,
            dest_dir: default_dest_dir(),
            cookies_file: None,
            custom_args: None,
        }
    }
}

/// Default destination folder under the user's download directory
pub fn default_dest_dir() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(crate::constants::paths::DEFAULT_FOLDER)
}

/// A pending download request owned by the queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    /// Resource locator; identity for duplicate detection (exact match)
    pub url: String,
    /// Option snapshot frozen at enqueue time
    pub options: OptionSnapshot,
    /// When this item was enqueued
    pub queued_at: DateTime<Utc>,
}

impl QueueItem {
    /// Create a new queue item with a fresh timestamp
    pub fn new(url: impl Into<String>, options: OptionSnapshot) -> Self {
        Self {
            url: url.into(),
            options,
            queued_at: Utc::now(),
        }
    }
}

/// Phase of a transfer progress update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    /// Metadata probe in flight
    Probing,
    /// Bytes moving
    Downloading,
    /// Transfer complete, post-processing may follow
    Finished,
}

/// A progress update relayed from the engine
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Current phase
    pub phase: ProgressPhase,
    /// Fraction complete in `[0, 1]`, `None` when unknown
    pub percent: Option<f32>,
    /// Human-readable transfer rate, as reported by the engine
    pub speed: Option<String>,
    /// Human-readable remaining-time estimate
    pub eta: Option<String>,
}

impl ProgressEvent {
    /// A phase-only event with no numeric progress
    pub fn phase(phase: ProgressPhase) -> Self {
        Self {
            phase,
            percent: None,
            speed: None,
            eta: None,
        }
    }
}

/// Phase of a post-processing update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcessPhase {
    /// Processor invoked
    Started,
    /// Processor working on a file
    Processing,
    /// Processor finished
    Finished,
}

/// A post-processing update relayed from the engine
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessEvent {
    /// Current phase
    pub phase: PostProcessPhase,
    /// Name of the processor (e.g. "ExtractAudio", "VideoConvertor")
    pub processor: String,
    /// File being worked on, when known
    pub file_name: Option<String>,
}

/// Events emitted by a running session, consumed on the control side
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Transfer progress update
    Progress(ProgressEvent),
    /// Post-processing update
    PostProcess(PostProcessEvent),
    /// Human-readable session log line
    Log(String),
}

/// Terminal outcome of a transfer session
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// Transfer and post-processing completed
    Succeeded {
        /// Final media title from the engine
        title: String,
    },
    /// User cancelled; partial artifacts cleaned up best-effort
    Cancelled,
    /// Any fatal failure; message surfaced to the user
    Failed {
        /// Short human-readable reason
        error: String,
    },
}

/// Caller-facing result of a transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReport {
    /// Whether the transfer completed successfully
    pub success: bool,
    /// Media title on success
    pub title: Option<String>,
    /// Failure reason; `"Cancelled"` reserved for user cancellation
    pub error: Option<String>,
}

impl From<TransferOutcome> for TransferReport {
    fn from(outcome: TransferOutcome) -> Self {
        match outcome {
            TransferOutcome::Succeeded { title } => Self {
                success: true,
                title: Some(title),
                error: None,
            },
            TransferOutcome::Cancelled => Self {
                success: false,
                title: None,
                error: Some("Cancelled".to_string()),
            },
            TransferOutcome::Failed { error } => Self {
                success: false,
                title: None,
                error: Some(error),
            },
        }
    }
}

impl TransferReport {
    /// Whether this report represents a user cancellation
    pub fn is_cancelled(&self) -> bool {
        self.error.as_deref() == Some("Cancelled")
    }
}
