//! Application constants for Yard Fetcher
//!
//! Constants are grouped by functional domain. Values that mirror the fetch
//! engine's conventions (partial-file suffixes, output template) live under
//! `engine`; transcode argument profiles live under `transcode`.

use std::time::Duration;

/// File names for persisted state
pub mod paths {
    /// Settings store file name (TOML)
    pub const SETTINGS_FILE: &str = "settings.toml";

    /// Queue snapshot file name (JSON)
    pub const QUEUE_FILE: &str = "queue.json";

    /// Instance lock file name
    pub const LOCK_FILE: &str = "yard_fetcher.lock";

    /// Application data directory name
    pub const APP_DIR: &str = "yard_fetcher";

    /// Default destination folder name under the user's download directory
    pub const DEFAULT_FOLDER: &str = "yard";
}

/// Session thresholds and timeouts
pub mod session {
    use super::Duration;

    /// Bounded timeout for the metadata probe
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

    /// Duration above which a long-running transfer warning is emitted
    pub const LONG_DURATION_WARNING: Duration = Duration::from_secs(3 * 3600);
}

/// Disk-space preflight margins
pub mod preflight {
    /// Bytes per gibibyte
    pub const BYTES_PER_GB: f64 = 1_073_741_824.0;

    /// Extra headroom (GB) required before a transfer proceeds silently
    pub const LOW_SPACE_MARGIN_GB: f64 = 1.0;
}

/// Fetch engine conventions
pub mod engine {
    /// Candidate install locations for the engine binary
    pub const BINARY_CANDIDATES: &[&str] = &[
        "/opt/homebrew/bin/yt-dlp",
        "/usr/local/bin/yt-dlp",
        "/usr/bin/yt-dlp",
        "yt-dlp",
    ];

    /// Output file naming template
    pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

    /// Suffixes of partial/incomplete download artifacts cleaned up on cancel
    pub const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl"];

    /// Audio extraction quality tier (kbit/s)
    pub const AUDIO_QUALITY: &str = "192";

    /// Optional JS interpreter binary looked up for engine auxiliary use
    pub const JS_RUNTIME_BINARY: &str = "deno";
}

/// Constant-frame-rate transcode profile for compatibility mode
pub mod transcode {
    /// ffmpeg arguments applied by the engine's video convertor pass
    pub const CFR_PROFILE: &[&str] = &[
        "-c:v",
        "libx264",
        "-preset",
        "veryfast",
        "-crf",
        "23",
        "-vsync",
        "cfr",
        "-c:a",
        "aac",
        "-b:a",
        "192k",
        "-movflags",
        "+faststart",
    ];
}
