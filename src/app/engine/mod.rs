//! External fetch-engine abstraction
//!
//! The orchestrator talks to the media-fetch engine through the
//! [`FetchEngine`] trait: a metadata-only probe plus the real transfer. The
//! production implementation drives a yt-dlp subprocess; tests substitute a
//! scripted mock. Cancellation crosses the seam as a single shared flag the
//! engine polls at every progress tick.

pub mod options;
pub mod ytdlp;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::app::models::SessionEvent;
use crate::errors::EngineResult;

pub use options::EngineOptions;
pub use ytdlp::YtDlpEngine;

/// Cooperative cancellation flag shared between the control side and the
/// active transfer
///
/// The control side sets it; the engine observes it at the next progress
/// callback and aborts with [`crate::errors::EngineError::Cancelled`]. Setting
/// it more than once is a no-op.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a fresh, unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation (idempotent)
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One stream variant reported by the probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFormat {
    /// Video height in pixels; `None` for audio-only streams
    pub height: Option<u32>,
}

/// Metadata returned by the probe and again after a finished transfer
#[derive(Debug, Clone, PartialEq)]
pub struct MediaMetadata {
    /// Media title
    pub title: String,
    /// Duration in seconds, 0 when unknown
    pub duration_seconds: u64,
    /// Whether this is a live/ongoing broadcast
    pub is_live: bool,
    /// Stream variants on offer
    pub formats: Vec<StreamFormat>,
    /// Estimated output size in bytes, when the engine reports one
    pub estimated_size_bytes: Option<u64>,
}

impl MediaMetadata {
    /// Distinct available heights, descending
    pub fn available_heights(&self) -> Vec<u32> {
        crate::app::format::available_heights(self.formats.iter().map(|f| f.height))
    }
}

/// Contract for the external media-fetch engine
#[async_trait]
pub trait FetchEngine: Send + Sync {
    /// Metadata-only query; no data transfer
    async fn probe(&self, url: &str, options: &EngineOptions) -> EngineResult<MediaMetadata>;

    /// Run the real transfer, relaying progress and post-process events
    ///
    /// Implementations must poll `cancel` at each progress callback and abort
    /// with the cancellation signature when it is set.
    async fn transfer(
        &self,
        url: &str,
        options: &EngineOptions,
        events: mpsc::Sender<SessionEvent>,
        cancel: CancelFlag,
    ) -> EngineResult<MediaMetadata>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_is_idempotent() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        flag.cancel();
        flag.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn cancel_flag_clones_share_state() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        flag.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn metadata_heights_collapse_duplicates() {
        let meta = MediaMetadata {
            title: "t".into(),
            duration_seconds: 0,
            is_live: false,
            formats: vec![
                StreamFormat { height: Some(720) },
                StreamFormat { height: None },
                StreamFormat { height: Some(1080) },
                StreamFormat { height: Some(720) },
            ],
            estimated_size_bytes: None,
        };
        assert_eq!(meta.available_heights(), vec![1080, 720]);
    }
}
