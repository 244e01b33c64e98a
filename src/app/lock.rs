//! Single-instance lock
//!
//! A PID file in the application data directory keeps two copies of the tool
//! from fighting over the queue snapshot. A lock left behind by a dead
//! process is reclaimed after a liveness check against the process table.

use std::path::{Path, PathBuf};

use sysinfo::{Pid, System};
use tracing::{debug, info};

use crate::errors::LockError;

/// Held lock; the PID file is removed on drop
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock at `path`
    ///
    /// Fails with [`LockError::AlreadyRunning`] when the file names a live
    /// process other than this one. A stale file is reclaimed.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();

        if let Some(pid) = read_pid(&path) {
            if pid != std::process::id() && process_is_alive(pid) {
                return Err(LockError::AlreadyRunning { pid });
            }
            info!("Reclaiming stale lock left by pid {}", pid);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, std::process::id().to_string())?;
        debug!("Acquired instance lock at {}", path.display());
        Ok(Self { path })
    }

    /// Lock file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!("Could not remove lock file: {}", e);
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()?
        .trim()
        .parse::<u32>()
        .ok()
}

fn process_is_alive(pid: u32) -> bool {
    let mut system = System::new();
    system.refresh_processes();
    system.process(Pid::from_u32(pid)).is_some()
}
