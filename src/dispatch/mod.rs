//! Pluggable notification display backends

mod command;
mod desktop;

pub use command::CommandBackend;
pub use desktop::DesktopBackend;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::message::Message;

/// Errors from a delivery attempt
///
/// Delivery is fire-and-forget: the receiver logs these and never retries.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("notification call failed: {0}")]
    Backend(String),

    #[error("display command could not be run: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("display command exited with {0}")]
    Exit(std::process::ExitStatus),
}

/// Contract for delivering a validated message to the user's display surface
#[async_trait]
pub trait DispatchBackend: Send + Sync {
    async fn deliver(&self, message: &Message) -> Result<(), DispatchError>;
}

/// Which backend implementation the receiver uses, selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Session-bus `org.freedesktop.Notifications` call
    #[default]
    Desktop,
    /// External display command invocation
    Command,
}

/// Build the configured backend
pub fn from_config(kind: BackendKind, command: Option<String>) -> Result<Box<dyn DispatchBackend>> {
    match kind {
        BackendKind::Desktop => Ok(Box::new(DesktopBackend::new())),
        BackendKind::Command => {
            let program =
                command.context("backend = \"command\" requires a command to be configured")?;
            Ok(Box::new(CommandBackend::new(program)))
        }
    }
}
