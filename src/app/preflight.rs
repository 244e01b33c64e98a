//! Disk-space preflight check
//!
//! Run after the metadata probe and before committing bytes to the network,
//! so a transfer that cannot fit on the destination volume never starts.

use std::path::Path;

use tracing::{debug, warn};

use crate::constants::preflight::{BYTES_PER_GB, LOW_SPACE_MARGIN_GB};

/// Outcome of the disk-space check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpaceDecision {
    /// Plenty of room; continue silently
    Proceed,
    /// Enough room but inside the low-space margin; log and continue
    ProceedWithWarning {
        /// Estimated output size in GB
        required_gb: f64,
        /// Free space on the destination volume in GB
        free_gb: f64,
    },
    /// Not enough room; the transfer must not start
    Abort {
        /// Estimated output size in GB
        required_gb: f64,
        /// Free space on the destination volume in GB
        free_gb: f64,
    },
}

/// Decision kernel on already-computed GB figures
pub fn decide(required_gb: f64, free_gb: f64) -> SpaceDecision {
    if free_gb < required_gb {
        SpaceDecision::Abort {
            required_gb,
            free_gb,
        }
    } else if free_gb < required_gb + LOW_SPACE_MARGIN_GB {
        SpaceDecision::ProceedWithWarning {
            required_gb,
            free_gb,
        }
    } else {
        SpaceDecision::Proceed
    }
}

/// Check free space at `dest` against an estimated output size
///
/// A zero/unknown estimate always proceeds: there is no data to judge by.
/// A failed free-space query also proceeds, since aborting on a metadata
/// error would block transfers that may well succeed.
pub fn check_space(estimated_bytes: u64, dest: &Path) -> SpaceDecision {
    if estimated_bytes == 0 {
        debug!("No size estimate from probe, skipping disk-space check");
        return SpaceDecision::Proceed;
    }

    let free_bytes = match fs2::available_space(dest) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Could not query free space for {}: {}", dest.display(), e);
            return SpaceDecision::Proceed;
        }
    };

    let required_gb = estimated_bytes as f64 / BYTES_PER_GB;
    let free_gb = free_bytes as f64 / BYTES_PER_GB;
    let decision = decide(required_gb, free_gb);

    match decision {
        SpaceDecision::Proceed => {}
        SpaceDecision::ProceedWithWarning {
            required_gb,
            free_gb,
        } => warn!(
            "Low disk space: ~{:.1} GB required, {:.1} GB available",
            required_gb, free_gb
        ),
        SpaceDecision::Abort {
            required_gb,
            free_gb,
        } => warn!(
            "Insufficient disk space: {:.1} GB required, {:.1} GB available",
            required_gb, free_gb
        ),
    }

    decision
}
