//! Core application components
//!
//! This module contains the download orchestration machinery: the fetch
//! engine seam and its yt-dlp adapter, the single-transfer session, the
//! pending queue with its persisted snapshot, the driver that enforces the
//! one-live-session invariant, and the supporting pieces (quality/format
//! resolution, disk-space preflight, custom-argument parsing, instance
//! locking).

pub mod args;
pub mod driver;
pub mod engine;
pub mod format;
pub mod lock;
pub mod models;
pub mod preflight;
pub mod queue;
pub mod session;

pub use driver::{SessionDriver, Submission};
pub use engine::{CancelFlag, EngineOptions, FetchEngine, MediaMetadata, YtDlpEngine};
pub use lock::InstanceLock;
pub use models::{
    OptionSnapshot, PostProcessEvent, PostProcessPhase, ProgressEvent, ProgressPhase, Quality,
    QueueItem, SessionEvent, TransferOutcome, TransferReport,
};
pub use queue::{DownloadQueue, QueueStore};
pub use session::TransferSession;
