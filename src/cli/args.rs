//! Command-line argument parsing for Yard Fetcher
//!
//! This module defines the CLI structure using clap derive macros: a
//! download command for immediate transfers and a queue command for managing
//! the persisted backlog.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::models::{OptionSnapshot, Quality};

/// Yard Fetcher - Download online media through yt-dlp
#[derive(Parser, Debug)]
#[command(
    name = "yard_fetcher",
    version,
    about = "Download online media with quality fallback and a persistent queue",
    long_about = "A media download tool driving yt-dlp with adaptive quality fallback,
disk-space preflight checks, cooperative cancellation, and a persisted download queue."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Application data directory (settings, queue, lock)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a URL now, then drain the queue
    Download(DownloadArgs),

    /// Manage the pending download queue
    Queue(QueueArgs),
}

/// Arguments for the download command
#[derive(Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    /// Media URL to download
    #[arg(value_name = "URL")]
    pub url: String,

    /// Download options
    #[command(flatten)]
    pub options: OptionArgs,
}

/// Per-download option flags, layered over the persisted defaults
#[derive(Args, Debug, Clone, Default)]
pub struct OptionArgs {
    /// Extract audio only
    #[arg(short, long)]
    pub audio: bool,

    /// Target quality (best, 2160p, 1440p, 1080p, 720p, 480p)
    #[arg(short = 'Q', long)]
    pub quality: Option<Quality>,

    /// Target container or audio codec (e.g. mp4, mkv, mp3)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Download the whole playlist instead of a single item
    #[arg(short, long)]
    pub playlist: bool,

    /// Skip the constant-frame-rate compatibility re-encode
    #[arg(long)]
    pub no_compat: bool,

    /// Destination folder
    #[arg(short = 'o', long, value_name = "DIR")]
    pub folder: Option<PathBuf>,

    /// Cookies file to pass to the engine
    #[arg(long, value_name = "FILE")]
    pub cookies: Option<PathBuf>,

    /// Extra engine arguments, e.g. "--rate-limit 1M"
    #[arg(long, value_name = "ARGS")]
    pub engine_args: Option<String>,
}

/// Arguments for queue management
#[derive(Args, Debug)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub action: QueueAction,
}

/// Queue management actions
#[derive(Subcommand, Debug)]
pub enum QueueAction {
    /// Add a URL to the back of the queue
    Add {
        /// Media URL to queue
        #[arg(value_name = "URL")]
        url: String,

        /// Download options frozen into the queued entry
        #[command(flatten)]
        options: OptionArgs,
    },

    /// List pending downloads
    List,

    /// Remove the pending download at a position (0-based)
    Remove {
        /// Queue position
        #[arg(value_name = "INDEX")]
        index: usize,
    },

    /// Drop every pending download
    Clear,

    /// Process the queue until it is empty
    Run,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl OptionArgs {
    /// Layer these flags over persisted defaults
    ///
    /// Boolean flags only switch their feature on; absent flags leave the
    /// stored default in place.
    pub fn apply(&self, mut base: OptionSnapshot) -> OptionSnapshot {
        if self.audio {
            base.audio_only = true;
        }
        if let Some(quality) = self.quality {
            base.quality = quality;
        }
        if let Some(format) = &self.format {
            base.format = format.to_lowercase();
        }
        if self.playlist {
            base.playlist = true;
        }
        if self.no_compat {
            base.compat_mode = false;
        }
        if let Some(folder) = &self.folder {
            base.dest_dir = folder.clone();
        }
        if let Some(cookies) = &self.cookies {
            base.cookies_file = Some(cookies.clone());
        }
        if let Some(engine_args) = &self.engine_args {
            base.custom_args = Some(engine_args.clone());
        }
        base
    }
}
