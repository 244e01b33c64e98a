//! Yard Fetcher Library
//!
//! A media download orchestrator driving yt-dlp: one transfer at a time with
//! adaptive quality fallback, disk-space preflight, cooperative cancellation,
//! and a persisted FIFO queue behind the live session.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use app::{
    CancelFlag, DownloadQueue, FetchEngine, OptionSnapshot, Quality, QueueStore, SessionDriver,
    TransferReport, TransferSession, YtDlpEngine,
};
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(constants::paths::QUEUE_FILE, "queue.json");
        assert_eq!(constants::session::PROBE_TIMEOUT.as_secs(), 15);
        assert!(constants::engine::PARTIAL_SUFFIXES.contains(&".part"));
    }

    #[test]
    fn test_error_types() {
        let engine_error = errors::EngineError::Cancelled;
        let app_error = AppError::Engine(engine_error);

        assert_eq!(app_error.category(), "engine");
        assert_eq!(app_error.to_string(), "Cancelled");
    }
}
