//! Session driver: one live transfer plus the queue behind it
//!
//! The driver enforces the single-session invariant. Submitting while a
//! transfer is live is a cancel request for that transfer, not a second
//! session. Whenever a session resolves the driver immediately dequeues the
//! next pending request, persists the shrunken queue, and starts it, so
//! queued items drain with no idle gap.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::app::engine::{CancelFlag, FetchEngine};
use crate::app::models::{OptionSnapshot, SessionEvent, TransferOutcome, TransferReport};
use crate::app::queue::{DownloadQueue, QueueStore};
use crate::app::session::TransferSession;
use crate::config::SettingsStore;

/// What a submission did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// No session was live; a new one started
    Started,
    /// A session was live; it was asked to cancel instead
    CancelRequested,
}

struct ActiveTransfer {
    url: String,
    options: OptionSnapshot,
    cancel: CancelFlag,
    handle: JoinHandle<TransferReport>,
}

/// Owns the live session and drains the queue behind it
pub struct SessionDriver {
    engine: Arc<dyn FetchEngine>,
    store: QueueStore,
    settings: Option<SettingsStore>,
    queue: DownloadQueue,
    events: mpsc::Sender<SessionEvent>,
    active: Option<ActiveTransfer>,
}

impl SessionDriver {
    /// Create a driver, restoring any persisted queue
    pub fn new(
        engine: Arc<dyn FetchEngine>,
        store: QueueStore,
        settings: Option<SettingsStore>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let queue = store.load();
        if !queue.is_empty() {
            info!("Restored {} queued download(s)", queue.len());
        }
        Self {
            engine,
            store,
            settings,
            queue,
            events,
            active: None,
        }
    }

    /// Whether a transfer session is currently live
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// URL of the live transfer, when any
    pub fn active_url(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.url.as_str())
    }

    /// Pending requests behind the live session
    pub fn queue(&self) -> &DownloadQueue {
        &self.queue
    }

    /// Submit a download request
    ///
    /// With no live session this starts one immediately. With a live session
    /// it requests cancellation of that session and discards the submission;
    /// the caller decides whether to resubmit.
    pub fn submit(&mut self, url: &str, options: OptionSnapshot) -> Submission {
        if let Some(active) = &self.active {
            info!("Transfer already live for {}, requesting cancel", active.url);
            active.cancel.cancel();
            return Submission::CancelRequested;
        }
        self.start_session(url.to_string(), options);
        Submission::Started
    }

    /// Ask the live session to stop; `false` when nothing is live
    ///
    /// Safe to call repeatedly; the flag is idempotent.
    pub fn cancel_active(&self) -> bool {
        match &self.active {
            Some(active) => {
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancellation handle for the live session, when any
    pub fn active_cancel(&self) -> Option<CancelFlag> {
        self.active.as_ref().map(|a| a.cancel.clone())
    }

    /// Start the next queued request
    ///
    /// Returns `false` when a session is already live or the queue is empty.
    pub fn start_next(&mut self) -> bool {
        if self.active.is_some() {
            return false;
        }
        match self.queue.dequeue_front() {
            Some(next) => {
                self.persist();
                self.start_session(next.url, next.options);
                true
            }
            None => false,
        }
    }

    /// Add a request behind the live session and persist the queue
    pub fn enqueue(&mut self, url: &str, options: OptionSnapshot) -> bool {
        let added = self.queue.enqueue(url, options);
        if added {
            self.persist();
        }
        added
    }

    /// Remove the pending request at `index` and persist
    pub fn remove_queued(&mut self, index: usize) -> bool {
        let removed = self.queue.remove_at(index).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    /// Drop every pending request and persist
    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.persist();
    }

    /// Wait for the live session to end
    ///
    /// On success the completed options become the new persisted defaults.
    /// Whatever the outcome, the next queued request starts immediately.
    /// Returns `None` when nothing is live.
    ///
    /// Cancel-safe: dropping the returned future mid-wait leaves the live
    /// session in place, so it can be awaited again.
    pub async fn wait_active(&mut self) -> Option<TransferReport> {
        let report = match (&mut self.active.as_mut()?.handle).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Session task failed: {}", e);
                TransferOutcome::Failed {
                    error: "internal session failure".to_string(),
                }
                .into()
            }
        };
        let active = self.active.take()?;

        if report.success {
            if let Some(settings) = &self.settings {
                if let Err(e) = settings.save(&active.options) {
                    warn!("Could not persist settings: {}", e);
                }
            }
        }

        if let Some(next) = self.queue.dequeue_front() {
            self.persist();
            info!("Starting next queued download: {}", next.url);
            self.start_session(next.url, next.options);
        }

        Some(report)
    }

    /// Run the live session and everything queued behind it to completion
    pub async fn run_to_completion(&mut self) -> Vec<TransferReport> {
        let mut reports = Vec::new();
        while let Some(report) = self.wait_active().await {
            reports.push(report);
        }
        reports
    }

    fn start_session(&mut self, url: String, options: OptionSnapshot) {
        let cancel = CancelFlag::new();
        let session = TransferSession::new(
            self.engine.clone(),
            url.clone(),
            options.clone(),
            self.events.clone(),
            cancel.clone(),
        );
        let handle = tokio::spawn(session.run());
        self.active = Some(ActiveTransfer {
            url,
            options,
            cancel,
            handle,
        });
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.queue) {
            warn!("Could not persist queue: {}", e);
        }
    }
}
