//! Desktop notification backend via the session bus

use async_trait::async_trait;
use notify_rust::{Hint, Notification, Timeout, Urgency as DesktopUrgency};

use super::{DispatchBackend, DispatchError};
use crate::message::{Message, Urgency};

const APP_NAME: &str = "herald";

/// Delivers messages as freedesktop.org desktop notifications
#[derive(Debug, Default)]
pub struct DesktopBackend;

impl DesktopBackend {
    pub fn new() -> Self {
        Self
    }
}

fn map_urgency(urgency: Urgency) -> DesktopUrgency {
    match urgency {
        Urgency::Low => DesktopUrgency::Low,
        Urgency::Normal => DesktopUrgency::Normal,
        Urgency::Critical => DesktopUrgency::Critical,
    }
}

fn map_timeout(ms: i32) -> Timeout {
    match ms {
        t if t < 0 => Timeout::Default,
        0 => Timeout::Never,
        t => Timeout::Milliseconds(t as u32),
    }
}

#[async_trait]
impl DispatchBackend for DesktopBackend {
    async fn deliver(&self, message: &Message) -> Result<(), DispatchError> {
        let mut notification = Notification::new();
        notification
            .appname(APP_NAME)
            .summary(&message.title)
            .body(&message.body)
            .hint(Hint::Urgency(map_urgency(message.urgency)))
            .hint(Hint::DesktopEntry(APP_NAME.to_string()))
            .timeout(map_timeout(message.timeout));
        if !message.icon.is_empty() {
            notification.icon(&message.icon);
        }

        notification
            .show()
            .map(|_| ())
            .map_err(|e| DispatchError::Backend(e.to_string()))
    }
}
