//! Typed engine options and argument rendering
//!
//! Replaces the ad-hoc option dictionaries of callback-style wrappers with an
//! explicit structure plus a small typed override map for the free-form
//! custom-argument feature. Overrides are rendered after every computed
//! default, so explicit user intent wins.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::app::args::ArgValue;
use crate::app::models::OptionSnapshot;
use crate::constants::{engine, transcode};

/// Options handed to the fetch engine for a probe or transfer
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Resolved stream-selection expression
    pub format_expression: String,
    /// Destination directory for the output
    pub dest_dir: PathBuf,
    /// Extract audio only
    pub audio_only: bool,
    /// Target container (video) or codec (audio) name, lowercase
    pub target_format: String,
    /// Download the whole playlist
    pub playlist: bool,
    /// Re-encode to constant frame rate after the transfer
    pub compat_mode: bool,
    /// Cookie file passed through; caller verified existence
    pub cookies_file: Option<PathBuf>,
    /// Directory containing an optional JS interpreter binary, prepended to
    /// the subprocess PATH when discovered
    pub js_runtime_dir: Option<PathBuf>,
    /// Typed overrides parsed from the custom argument string; rendered last
    pub overrides: BTreeMap<String, ArgValue>,
}

impl EngineOptions {
    /// Build engine options from a frozen snapshot and a resolved expression
    pub fn from_snapshot(snapshot: &OptionSnapshot, format_expression: String) -> Self {
        Self {
            format_expression,
            dest_dir: snapshot.dest_dir.clone(),
            audio_only: snapshot.audio_only,
            target_format: snapshot.format.to_lowercase(),
            playlist: snapshot.playlist,
            compat_mode: snapshot.compat_mode,
            cookies_file: None,
            js_runtime_dir: None,
            overrides: BTreeMap::new(),
        }
    }

    /// Merge parsed custom-argument overrides (explicit intent wins)
    pub fn with_overrides(mut self, overrides: BTreeMap<String, ArgValue>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    /// Render the transfer argument vector
    ///
    /// The URL is appended by the adapter after these arguments.
    pub fn transfer_args(&self) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            self.format_expression.clone(),
            "--newline".to_string(),
            "--no-warnings".to_string(),
            "-P".to_string(),
            self.dest_dir.to_string_lossy().to_string(),
            "-o".to_string(),
            engine::OUTPUT_TEMPLATE.to_string(),
        ];

        if !self.playlist {
            args.push("--no-playlist".to_string());
        }

        if let Some(cookies) = &self.cookies_file {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().to_string());
        }

        if self.audio_only {
            args.push("-x".to_string());
            args.push("--audio-format".to_string());
            args.push(self.target_format.clone());
            args.push("--audio-quality".to_string());
            args.push(engine::AUDIO_QUALITY.to_string());
        } else {
            args.push("--merge-output-format".to_string());
            args.push(self.target_format.clone());

            if self.compat_mode {
                args.push("--recode-video".to_string());
                args.push(self.target_format.clone());
                args.push("--postprocessor-args".to_string());
                args.push(format!(
                    "VideoConvertor:{}",
                    transcode::CFR_PROFILE.join(" ")
                ));
            }
        }

        // Explicit user overrides go last so they win over computed defaults
        for (key, value) in &self.overrides {
            let flag = format!("--{}", key.replace('_', "-"));
            match value {
                ArgValue::Flag(true) => args.push(flag),
                ArgValue::Flag(false) => {}
                ArgValue::Int(n) => {
                    args.push(flag);
                    args.push(n.to_string());
                }
                ArgValue::Text(s) => {
                    args.push(flag);
                    args.push(s.clone());
                }
            }
        }

        args
    }
}
