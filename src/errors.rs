//! Error types for Yard Fetcher
//!
//! This module defines error types for all components of the orchestrator.
//! Cancellation is modelled as a distinguished variant rather than a generic
//! failure so the session can map user intent to the `Cancelled` outcome
//! without string matching.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the external fetch/transcode engines
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine binary could not be located on this system
    #[error("Fetch engine not found. Install yt-dlp and make sure it is on PATH")]
    BinaryNotFound,

    /// Failed to spawn the engine subprocess
    #[error("Failed to start fetch engine")]
    Spawn(#[from] std::io::Error),

    /// Metadata probe exceeded its bounded timeout
    #[error("Metadata probe timed out after {seconds} seconds")]
    ProbeTimeout { seconds: u64 },

    /// User-initiated cancellation observed during the transfer
    #[error("Cancelled")]
    Cancelled,

    /// The engine exited with a failure; message relayed verbatim
    #[error("{message}")]
    Failed { message: String },

    /// The engine produced output we could not interpret
    #[error("Failed to parse engine output: {reason}")]
    Output { reason: String },
}

impl EngineError {
    /// Check whether this error carries the cancellation signature
    pub fn is_cancellation(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}

/// Errors that terminate a transfer session
#[derive(Error, Debug)]
pub enum SessionError {
    /// Metadata probe failed; engine message surfaced verbatim
    #[error("{message}")]
    Probe { message: String },

    /// Destination volume does not have room for the estimated output
    #[error("Insufficient disk space ({free_gb:.1}GB available, {required_gb:.1}GB needed)")]
    InsufficientSpace { required_gb: f64, free_gb: f64 },

    /// User-initiated cancellation; not a true failure
    #[error("Cancelled")]
    Cancelled,

    /// Any other engine failure during transfer or post-processing
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Destination directory could not be prepared
    #[error("Failed to prepare destination directory: {path}")]
    Destination { path: PathBuf },

    /// Submitted URL does not look like an absolute resource locator
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Persistence errors for the queue and settings stores
///
/// These never propagate to the user: read failures degrade to empty/default
/// state and write failures are logged and dropped.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// File I/O error
    #[error("Store I/O error")]
    Io(#[from] std::io::Error),

    /// Queue snapshot could not be parsed
    #[error("Queue snapshot parse error")]
    Json(#[from] serde_json::Error),

    /// Settings file could not be parsed
    #[error("Settings parse error")]
    Toml(#[from] toml::de::Error),
}

/// Instance lock errors
#[derive(Error, Debug)]
pub enum LockError {
    /// Another live process owns the lock
    #[error("Another instance is already running (pid {pid})")]
    AlreadyRunning { pid: u32 },

    /// Lock file could not be created or read
    #[error("Lock file error")]
    Io(#[from] std::io::Error),
}

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    /// Transfer session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Engine error outside a session context
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Persistence error
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Instance lock error
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("{message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Session(_) => "session",
            AppError::Engine(_) => "engine",
            AppError::Persistence(_) => "persistence",
            AppError::Lock(_) => "lock",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Engine result type alias
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Session result type alias
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Persistence result type alias
pub type PersistResult<T> = std::result::Result<T, PersistenceError>;
