//! Command-line interface components
//!
//! This module contains CLI-specific code for the Yard Fetcher application,
//! including argument parsing, progress display, and command handlers.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{Cli, Commands, DownloadArgs, GlobalArgs, OptionArgs, QueueAction, QueueArgs};
pub use commands::{handle_download, handle_queue};
pub use progress::ProgressDisplay;
