//! Notification message model and wire format

use serde::{Deserialize, Serialize};

/// Urgency level of a notification
///
/// Unrecognized urgency strings deserialize to `Normal` rather than failing,
/// so a sender with a newer vocabulary cannot render a message undeliverable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    Critical,
}

impl From<String> for Urgency {
    fn from(value: String) -> Self {
        match value.as_str() {
            "low" => Urgency::Low,
            "critical" => Urgency::Critical,
            _ => Urgency::Normal,
        }
    }
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single notification, as written to a mailbox file
///
/// Message files are immutable: they are created by the sender, consumed once
/// by the receiver, and never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Notification title (required)
    pub title: String,
    /// Notification body
    #[serde(default)]
    pub body: String,
    /// Urgency level
    #[serde(default)]
    pub urgency: Urgency,
    /// FreeDesktop icon name
    #[serde(default)]
    pub icon: String,
    /// Display timeout in ms (-1 = backend default, 0 = persistent)
    #[serde(default = "default_timeout")]
    pub timeout: i32,
}

fn default_timeout() -> i32 {
    -1
}
