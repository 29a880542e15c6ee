//! Receiver configuration
//!
//! Loaded once at startup from `~/.config/herald/config.toml` and immutable
//! for the process lifetime. Unknown keys are ignored; a missing or invalid
//! file falls back to defaults with a logged warning, never an error.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::dispatch::BackendKind;
use crate::message::Urgency;

/// What happens to a message file after its single delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionMode {
    /// Remove the file
    #[default]
    Delete,
    /// Move the file into the mailbox's archive subdirectory, bounded by
    /// `max_history`
    Archive,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Maximum number of archived entries kept before eviction
    pub max_history: usize,
    /// When set, replaces every message's display timeout
    pub timeout_override: Option<i32>,
    /// When set, only messages with an urgency in this set are displayed
    pub urgency_filter: Option<Vec<Urgency>>,
    /// Whether message bodies are shown
    pub show_body: bool,
    pub retention_mode: RetentionMode,
    /// Display backend selection
    pub backend: BackendKind,
    /// Display program for `backend = "command"`
    pub command: Option<String>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            max_history: 100,
            timeout_override: None,
            urgency_filter: None,
            show_body: true,
            retention_mode: RetentionMode::default(),
            backend: BackendKind::default(),
            command: None,
        }
    }
}

impl ReceiverConfig {
    pub fn config_path() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|d| d.home_dir().join(".config/herald/config.toml"))
    }

    /// Load the user's configuration, falling back to defaults on any problem
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("could not determine home directory, using default config");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.is_file() {
            return Self::default();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("failed to read config {}: {e}, using defaults", path.display());
                return Self::default();
            }
        };

        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("failed to parse config {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }
}
