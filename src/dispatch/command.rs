//! External-command notification backend

use async_trait::async_trait;
use tokio::process::Command;

use super::{DispatchBackend, DispatchError};
use crate::message::Message;

/// Delivers messages by invoking an external display program
///
/// The program receives five arguments: title, body, urgency name, icon and
/// timeout in milliseconds. A non-zero exit status is a delivery failure.
pub struct CommandBackend {
    program: String,
}

impl CommandBackend {
    pub fn new(program: String) -> Self {
        Self { program }
    }
}

#[async_trait]
impl DispatchBackend for CommandBackend {
    async fn deliver(&self, message: &Message) -> Result<(), DispatchError> {
        let status = Command::new(&self.program)
            .arg(&message.title)
            .arg(&message.body)
            .arg(message.urgency.as_str())
            .arg(&message.icon)
            .arg(message.timeout.to_string())
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(DispatchError::Exit(status))
        }
    }
}
