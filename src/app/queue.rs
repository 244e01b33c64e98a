//! Pending-download queue and its persisted snapshot
//!
//! The queue is strict FIFO over full option snapshots. Identity is the exact
//! URL string, so the same resource with different options is still a
//! duplicate and is rejected. The snapshot file is plain JSON; a missing or
//! corrupt file degrades to an empty queue rather than blocking startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::app::models::{OptionSnapshot, QueueItem, Quality};
use crate::app::session::validate_url;
use crate::errors::PersistResult;

/// FIFO queue of pending download requests
#[derive(Debug, Default, Clone)]
pub struct DownloadQueue {
    items: Vec<QueueItem>,
}

impl DownloadQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request to the back of the queue
    ///
    /// Returns `false` without modifying the queue when the URL is not an
    /// absolute URL or is already queued.
    pub fn enqueue(&mut self, url: &str, options: OptionSnapshot) -> bool {
        let url = url.trim();
        if validate_url(url).is_err() {
            debug!("Rejected non-URL queue submission: {:?}", url);
            return false;
        }
        if self.items.iter().any(|item| item.url == url) {
            debug!("Rejected duplicate queue submission: {}", url);
            return false;
        }
        self.items.push(QueueItem::new(url, options));
        true
    }

    /// Take the oldest request off the front
    pub fn dequeue_front(&mut self) -> Option<QueueItem> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    /// Remove the request at `index`; out-of-bounds is a no-op
    pub fn remove_at(&mut self, index: usize) -> Option<QueueItem> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Drop every pending request
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of pending requests
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue has no pending requests
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pending requests in FIFO order
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }
}

/// On-disk shape of one queued request
#[derive(Debug, Serialize, Deserialize)]
struct WireItem {
    url: String,
    settings: WireSettings,
}

/// On-disk shape of a frozen option snapshot
#[derive(Debug, Serialize, Deserialize)]
struct WireSettings {
    audio: bool,
    quality: String,
    format: String,
    playlist: bool,
    compat: bool,
    folder: String,
}

impl From<&QueueItem> for WireItem {
    fn from(item: &QueueItem) -> Self {
        Self {
            url: item.url.clone(),
            settings: WireSettings {
                audio: item.options.audio_only,
                quality: item.options.quality.to_string(),
                format: item.options.format.clone(),
                playlist: item.options.playlist,
                compat: item.options.compat_mode,
                folder: item.options.dest_dir.to_string_lossy().to_string(),
            },
        }
    }
}

impl WireItem {
    fn into_item(self) -> QueueItem {
        let quality = self
            .settings
            .quality
            .parse::<Quality>()
            .unwrap_or_default();
        let options = OptionSnapshot {
            audio_only: self.settings.audio,
            quality,
            format: self.settings.format,
            playlist: self.settings.playlist,
            compat_mode: self.settings.compat,
            dest_dir: PathBuf::from(self.settings.folder),
            ..OptionSnapshot::default()
        };
        QueueItem::new(self.url, options)
    }
}

/// JSON-backed persistence for the queue
#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    /// Create a store for a snapshot file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted queue
    ///
    /// A missing file is a fresh install and a corrupt file is treated the
    /// same way: both yield an empty queue, the latter with a warning.
    pub fn load(&self) -> DownloadQueue {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return DownloadQueue::new();
            }
            Err(e) => {
                warn!("Could not read queue file {}: {}", self.path.display(), e);
                return DownloadQueue::new();
            }
        };

        let wire: Vec<WireItem> = match serde_json::from_str(&data) {
            Ok(wire) => wire,
            Err(e) => {
                warn!(
                    "Queue file {} is corrupt, starting empty: {}",
                    self.path.display(),
                    e
                );
                return DownloadQueue::new();
            }
        };

        let mut queue = DownloadQueue::new();
        for item in wire {
            let item = item.into_item();
            // Re-validate on load so a hand-edited file cannot smuggle in
            // malformed entries
            if !queue.enqueue(&item.url, item.options) {
                warn!("Dropping invalid or duplicate queued entry: {}", item.url);
            }
        }
        queue
    }

    /// Persist the queue snapshot atomically (write then rename)
    pub fn save(&self, queue: &DownloadQueue) -> PersistResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let wire: Vec<WireItem> = queue.items().iter().map(WireItem::from).collect();
        let json = serde_json::to_string_pretty(&wire)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
