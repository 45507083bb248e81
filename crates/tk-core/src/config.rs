//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! selection, tool, and transcode sections. Every section defaults sensibly
//! so a completely empty `{}` file is valid. The process environment is read
//! in exactly one place, [`Config::apply_env`], at the binary's edge.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// Environment variable overriding [`SelectionConfig::preferred_languages`].
pub const PREFERRED_LANGUAGES_ENV: &str = "PREFERRED_LANGUAGES";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub selection: SelectionConfig,
    pub tools: ToolsConfig,
    pub transcode: TranscodeConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Overlay process environment settings onto this config.
    pub fn apply_env(&mut self) {
        let raw = std::env::var(PREFERRED_LANGUAGES_ENV).ok();
        self.selection.apply_preferred_languages(raw.as_deref());
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.selection.preferred_languages.is_empty() {
            warnings.push(
                "selection.preferred_languages is empty; every audio stream will be kept".into(),
            );
        }

        for (i, lang) in self.selection.preferred_languages.iter().enumerate() {
            let ok = matches!(lang.len(), 2 | 3) && lang.chars().all(|c| c.is_ascii_alphabetic());
            if !ok {
                warnings.push(format!(
                    "selection.preferred_languages[{i}] '{lang}' is not a two- or three-letter code"
                ));
            }
        }

        if self.selection.interactive_timeout_secs == 0 {
            warnings.push(
                "selection.interactive_timeout_secs is 0; manual sessions will stop immediately"
                    .into(),
            );
        }

        if self.transcode.timeout_secs == 0 {
            warnings.push("transcode.timeout_secs is 0; every remux will time out".into());
        }

        if self.transcode.output_suffix.trim().is_empty() {
            warnings.push(
                "transcode.output_suffix is empty; outputs may overwrite .mkv sources".into(),
            );
        }

        for (name, path) in [
            ("tools.ffmpeg_path", &self.tools.ffmpeg_path),
            ("tools.ffprobe_path", &self.tools.ffprobe_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!(
                        "{name} '{}' does not exist; falling back to PATH",
                        p.display()
                    ));
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Stream selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Ordered language preference (two- or three-letter identifiers).
    pub preferred_languages: Vec<String>,
    /// Fixed window an interactive selection session may await a choice.
    #[serde(default = "default_interactive_timeout")]
    pub interactive_timeout_secs: u64,
}

/// Fallback order when no preferred language is configured or recognised.
pub fn default_preferred_languages() -> Vec<String> {
    vec!["tel".into(), "hin".into(), "eng".into()]
}

fn default_interactive_timeout() -> u64 {
    180
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            preferred_languages: default_preferred_languages(),
            interactive_timeout_secs: default_interactive_timeout(),
        }
    }
}

impl SelectionConfig {
    /// Replace the language order from a comma-separated list.
    ///
    /// `None` or a list with no non-empty entries leaves the current order.
    pub fn apply_preferred_languages(&mut self, raw: Option<&str>) {
        let Some(raw) = raw else {
            return;
        };
        let parsed: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        if parsed.is_empty() {
            tracing::debug!("{PREFERRED_LANGUAGES_ENV} is empty; keeping configured order");
            return;
        }
        self.preferred_languages = parsed;
    }

    pub fn interactive_timeout(&self) -> Duration {
        Duration::from_secs(self.interactive_timeout_secs)
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Remux run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// Upper bound on a single remux run.
    #[serde(default = "default_transcode_timeout")]
    pub timeout_secs: u64,
    /// Inserted between the source stem and the extension of the output.
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,
    /// Delete the partially written output of a failed or cancelled run.
    #[serde(default = "default_true")]
    pub remove_partial_output: bool,
}

fn default_transcode_timeout() -> u64 {
    86_400
}

fn default_output_suffix() -> String {
    "processed".into()
}

fn default_true() -> bool {
    true
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_transcode_timeout(),
            output_suffix: default_output_suffix(),
            remove_partial_output: default_true(),
        }
    }
}

impl TranscodeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
