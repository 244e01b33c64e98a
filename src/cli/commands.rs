//! Command handlers for Yard Fetcher CLI
//!
//! This module wires CLI arguments to the core machinery: acquire the
//! instance lock, layer option flags over the persisted defaults, build a
//! driver around the yt-dlp engine, and run it while rendering progress.
//! Ctrl-C cancels the live transfer cooperatively.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::app::engine::YtDlpEngine;
use crate::app::models::OptionSnapshot;
use crate::app::queue::QueueStore;
use crate::app::{InstanceLock, SessionDriver, Submission};
use crate::cli::args::{DownloadArgs, GlobalArgs, QueueAction, QueueArgs};
use crate::cli::progress::ProgressDisplay;
use crate::config::{app_data_dir, SettingsStore};
use crate::constants::paths;
use crate::errors::{AppError, LockError, Result};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Handle the download command
///
/// Downloads the given URL with the layered options, then drains whatever is
/// in the persisted queue.
pub async fn handle_download(args: DownloadArgs, global: &GlobalArgs) -> Result<()> {
    let paths = DataPaths::resolve(global);
    let _lock = acquire_lock(&paths.lock);

    let settings = SettingsStore::new(&paths.settings);
    let options = args.options.apply(settings.load());

    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let display = ProgressDisplay::new(global.quiet).spawn(events_rx);

    let mut driver = SessionDriver::new(
        Arc::new(YtDlpEngine::new()),
        QueueStore::new(&paths.queue),
        Some(settings),
        events_tx,
    );

    match driver.submit(&args.url, options) {
        Submission::Started => {}
        Submission::CancelRequested => {
            return Err(AppError::generic("a transfer is already running"));
        }
    }

    let reports = drive_with_ctrl_c(&mut driver).await;
    drop(driver);
    let _ = display.await;

    summarize(&reports)
}

/// Handle the queue command
pub async fn handle_queue(args: QueueArgs, global: &GlobalArgs) -> Result<()> {
    let paths = DataPaths::resolve(global);

    match args.action {
        QueueAction::Add { url, options } => {
            let _lock = acquire_lock(&paths.lock);
            let settings = SettingsStore::new(&paths.settings);
            let store = QueueStore::new(&paths.queue);
            let mut queue = store.load();
            let snapshot = options.apply(settings.load());
            if !queue.enqueue(&url, snapshot) {
                return Err(AppError::generic(format!(
                    "not queued (invalid URL or already queued): {}",
                    url
                )));
            }
            store.save(&queue).map_err(AppError::Persistence)?;
            println!("Queued at position {}: {}", queue.len() - 1, url);
            Ok(())
        }

        QueueAction::List => {
            let queue = QueueStore::new(&paths.queue).load();
            if queue.is_empty() {
                println!("Queue is empty");
                return Ok(());
            }
            for (index, item) in queue.items().iter().enumerate() {
                let mode = if item.options.audio_only {
                    format!("audio/{}", item.options.format)
                } else {
                    format!("{}/{}", item.options.quality, item.options.format)
                };
                println!("{:>3}  {}  [{}]", index, item.url, mode);
            }
            Ok(())
        }

        QueueAction::Remove { index } => {
            let _lock = acquire_lock(&paths.lock);
            let store = QueueStore::new(&paths.queue);
            let mut queue = store.load();
            match queue.remove_at(index) {
                Some(item) => {
                    store.save(&queue).map_err(AppError::Persistence)?;
                    println!("Removed: {}", item.url);
                    Ok(())
                }
                None => Err(AppError::generic(format!(
                    "no queued download at position {}",
                    index
                ))),
            }
        }

        QueueAction::Clear => {
            let _lock = acquire_lock(&paths.lock);
            let store = QueueStore::new(&paths.queue);
            let mut queue = store.load();
            let dropped = queue.len();
            queue.clear();
            store.save(&queue).map_err(AppError::Persistence)?;
            println!("Dropped {} pending download(s)", dropped);
            Ok(())
        }

        QueueAction::Run => {
            let _lock = acquire_lock(&paths.lock);
            let settings = SettingsStore::new(&paths.settings);

            let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
            let display = ProgressDisplay::new(global.quiet).spawn(events_rx);

            let mut driver = SessionDriver::new(
                Arc::new(YtDlpEngine::new()),
                QueueStore::new(&paths.queue),
                Some(settings),
                events_tx,
            );

            if !driver.start_next() {
                drop(driver);
                let _ = display.await;
                println!("Queue is empty");
                return Ok(());
            }

            let reports = drive_with_ctrl_c(&mut driver).await;
            drop(driver);
            let _ = display.await;

            summarize(&reports)
        }
    }
}

/// Run the driver to completion, turning Ctrl-C into a cooperative cancel of
/// the live transfer
async fn drive_with_ctrl_c(
    driver: &mut SessionDriver,
) -> Vec<crate::app::models::TransferReport> {
    let mut reports = Vec::new();
    loop {
        let cancel = match driver.active_cancel() {
            Some(cancel) => cancel,
            None => break,
        };

        // The select arms must not touch the driver; the wait future holds
        // its mutable borrow
        let waited = tokio::select! {
            finished = driver.wait_active() => Some(finished),
            signal = tokio::signal::ctrl_c() => {
                if signal.is_err() {
                    warn!("Could not listen for Ctrl-C, running uninterruptible");
                }
                None
            }
        };

        match waited {
            Some(Some(report)) => {
                log_report(&report, driver.queue().len());
                reports.push(report);
            }
            Some(None) => break,
            None => {
                cancel.cancel();
                info!("Cancellation requested, waiting for the transfer to stop");
                if let Some(report) = driver.wait_active().await {
                    log_report(&report, driver.queue().len());
                    reports.push(report);
                } else {
                    break;
                }
            }
        }
    }
    reports
}

fn log_report(report: &crate::app::models::TransferReport, pending: usize) {
    if report.success {
        println!(
            "✓ Downloaded: {}",
            report.title.as_deref().unwrap_or("(untitled)")
        );
    } else if report.is_cancelled() {
        println!("✗ Cancelled");
    } else {
        println!(
            "✗ Failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    if pending > 0 {
        info!("{} download(s) still queued", pending);
    }
}

fn summarize(reports: &[crate::app::models::TransferReport]) -> Result<()> {
    let failed = reports
        .iter()
        .filter(|r| !r.success && !r.is_cancelled())
        .count();
    if failed > 0 {
        return Err(AppError::generic(format!(
            "{} of {} download(s) failed",
            failed,
            reports.len()
        )));
    }
    Ok(())
}

/// Try to take the single-instance lock
///
/// A held or unreadable lock is a warning, not a hard stop.
fn acquire_lock(path: &std::path::Path) -> Option<InstanceLock> {
    match InstanceLock::acquire(path) {
        Ok(lock) => Some(lock),
        Err(LockError::AlreadyRunning { pid }) => {
            warn!("Another instance appears to be running (pid {})", pid);
            println!("⚠️  Another instance appears to be running (pid {})", pid);
            None
        }
        Err(e) => {
            warn!("Could not acquire instance lock: {}", e);
            None
        }
    }
}

/// Resolved file locations inside the application data directory
struct DataPaths {
    settings: std::path::PathBuf,
    queue: std::path::PathBuf,
    lock: std::path::PathBuf,
}

impl DataPaths {
    fn resolve(global: &GlobalArgs) -> Self {
        let dir = global.data_dir.clone().unwrap_or_else(app_data_dir);
        Self {
            settings: dir.join(paths::SETTINGS_FILE),
            queue: dir.join(paths::QUEUE_FILE),
            lock: dir.join(paths::LOCK_FILE),
        }
    }
}
