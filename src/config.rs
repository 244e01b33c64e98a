//! Persisted user settings and application data paths
//!
//! Settings live in a flat TOML file inside the per-user application data
//! directory, next to the queue snapshot and the instance lock. Reads degrade
//! to the built-in defaults; save failures are surfaced to the caller, who
//! logs and drops them so persistence can never break a download.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::app::models::{default_dest_dir, OptionSnapshot, Quality};
use crate::constants::paths;
use crate::errors::PersistResult;

/// Per-user application data directory
///
/// Falls back to the current directory when the platform reports no data
/// directory at all.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(paths::APP_DIR)
}

/// On-disk settings shape
///
/// Every field is defaulted so older files with missing keys still load.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct SettingsFile {
    audio_only: bool,
    quality: Quality,
    format: String,
    playlist: bool,
    compat_mode: bool,
    folder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cookies_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_args: Option<String>,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self::from(&OptionSnapshot::default())
    }
}

impl From<&OptionSnapshot> for SettingsFile {
    fn from(options: &OptionSnapshot) -> Self {
        Self {
            audio_only: options.audio_only,
            quality: options.quality,
            format: options.format.clone(),
            playlist: options.playlist,
            compat_mode: options.compat_mode,
            folder: options.dest_dir.to_string_lossy().to_string(),
            cookies_file: options
                .cookies_file
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            custom_args: options.custom_args.clone(),
        }
    }
}

impl SettingsFile {
    fn into_options(self) -> OptionSnapshot {
        let dest_dir = if self.folder.trim().is_empty() {
            default_dest_dir()
        } else {
            PathBuf::from(self.folder)
        };
        OptionSnapshot {
            audio_only: self.audio_only,
            quality: self.quality,
            format: self.format,
            playlist: self.playlist,
            compat_mode: self.compat_mode,
            dest_dir,
            cookies_file: self.cookies_file.map(PathBuf::from),
            custom_args: self.custom_args,
        }
    }
}

/// TOML-backed store for the user's default download options
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Create a store for an explicit settings file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the standard per-user location
    pub fn at_default_location() -> Self {
        Self::new(app_data_dir().join(paths::SETTINGS_FILE))
    }

    /// Settings file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted settings
    ///
    /// A missing file yields the defaults silently; a corrupt file yields the
    /// defaults with a warning.
    pub fn load(&self) -> OptionSnapshot {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file yet, using defaults");
                return OptionSnapshot::default();
            }
            Err(e) => {
                warn!(
                    "Could not read settings {}: {}, using defaults",
                    self.path.display(),
                    e
                );
                return OptionSnapshot::default();
            }
        };

        match toml::from_str::<SettingsFile>(&data) {
            Ok(file) => file.into_options(),
            Err(e) => {
                warn!(
                    "Settings file {} is corrupt, using defaults: {}",
                    self.path.display(),
                    e
                );
                OptionSnapshot::default()
            }
        }
    }

    /// Persist the given options as the new defaults
    pub fn save(&self, options: &OptionSnapshot) -> PersistResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = SettingsFile::from(options);
        let toml = toml::to_string_pretty(&file).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(&self.path, toml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.toml"));
        assert_eq!(store.load(), OptionSnapshot::default());
    }

    #[test]
    fn settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.toml"));

        let mut options = OptionSnapshot::default();
        options.audio_only = true;
        options.quality = Quality::P720;
        options.format = "mp3".to_string();
        options.dest_dir = PathBuf::from("/tmp/music");
        options.custom_args = Some("--rate-limit 1M".to_string());
        store.save(&options).unwrap();

        assert_eq!(store.load(), options);
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "quality = [this is not toml").unwrap();
        assert_eq!(SettingsStore::new(path).load(), OptionSnapshot::default());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "audio_only = true\n").unwrap();
        let options = SettingsStore::new(path).load();
        assert!(options.audio_only);
        assert_eq!(options.quality, Quality::Best);
        assert_eq!(options.format, "mp4");
    }

    #[test]
    fn empty_folder_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "folder = \"\"\n").unwrap();
        let options = SettingsStore::new(path).load();
        assert_eq!(options.dest_dir, default_dest_dir());
    }
}
