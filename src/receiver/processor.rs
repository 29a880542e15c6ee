//! Per-file message processing: parse, validate, default, filter

use std::path::Path;

use tracing::warn;

use super::config::ReceiverConfig;
use crate::message::{Message, Urgency};

/// What the receiver should do with a message file
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Dispatch this message, with config adjustments already applied
    Deliver(Message),
    /// Suppressed by the urgency filter; not an error
    Filtered(Urgency),
    /// Unreadable, unparseable, or missing its title
    Malformed,
}

pub struct MessageProcessor {
    config: ReceiverConfig,
}

impl MessageProcessor {
    pub fn new(config: ReceiverConfig) -> Self {
        Self { config }
    }

    /// Classify a message file and prepare it for dispatch
    ///
    /// Defaults for absent optional fields and the unknown-urgency fallback
    /// are applied during parsing; `show_body` and `timeout_override` are
    /// applied here so the backend sees the final values.
    pub fn assess(&self, path: &Path) -> Disposition {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("could not read notification {}: {e}", path.display());
                return Disposition::Malformed;
            }
        };

        let mut message: Message = match serde_json::from_str(&raw) {
            Ok(message) => message,
            Err(e) => {
                warn!("could not parse notification {}: {e}", path.display());
                return Disposition::Malformed;
            }
        };

        if message.title.is_empty() {
            warn!("notification {} has an empty title", path.display());
            return Disposition::Malformed;
        }

        if let Some(filter) = &self.config.urgency_filter {
            if !filter.contains(&message.urgency) {
                return Disposition::Filtered(message.urgency);
            }
        }

        if !self.config.show_body {
            message.body.clear();
        }
        if let Some(timeout) = self.config.timeout_override {
            message.timeout = timeout;
        }

        Disposition::Deliver(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bad.json", "this is not json");
        let processor = MessageProcessor::new(ReceiverConfig::default());
        assert_eq!(processor.assess(&path), Disposition::Malformed);
    }

    #[test]
    fn test_missing_title_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "untitled.json", r#"{"body":"no title here"}"#);
        let processor = MessageProcessor::new(ReceiverConfig::default());
        assert_eq!(processor.assess(&path), Disposition::Malformed);
    }

    #[test]
    fn test_missing_file_is_malformed() {
        let processor = MessageProcessor::new(ReceiverConfig::default());
        assert_eq!(
            processor.assess(Path::new("/no/such/file.json")),
            Disposition::Malformed
        );
    }

    #[test]
    fn test_well_formed_message_is_delivered_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "ok.json", r#"{"title":"Just a title"}"#);
        let processor = MessageProcessor::new(ReceiverConfig::default());

        match processor.assess(&path) {
            Disposition::Deliver(msg) => {
                assert_eq!(msg.title, "Just a title");
                assert_eq!(msg.body, "");
                assert_eq!(msg.urgency, Urgency::Normal);
                assert_eq!(msg.timeout, -1);
            }
            other => panic!("expected Deliver, got {other:?}"),
        }
    }

    #[test]
    fn test_urgency_filter_applies() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReceiverConfig {
            urgency_filter: Some(vec![Urgency::Critical]),
            ..ReceiverConfig::default()
        };
        let processor = MessageProcessor::new(config);

        let low = write_file(&dir, "low.json", r#"{"title":"t","urgency":"low"}"#);
        assert_eq!(processor.assess(&low), Disposition::Filtered(Urgency::Low));

        let critical = write_file(&dir, "crit.json", r#"{"title":"t","urgency":"critical"}"#);
        assert!(matches!(processor.assess(&critical), Disposition::Deliver(_)));
    }

    #[test]
    fn test_show_body_and_timeout_override() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReceiverConfig {
            show_body: false,
            timeout_override: Some(5000),
            ..ReceiverConfig::default()
        };
        let processor = MessageProcessor::new(config);

        let path = write_file(
            &dir,
            "m.json",
            r#"{"title":"t","body":"secret","timeout":100}"#,
        );
        match processor.assess(&path) {
            Disposition::Deliver(msg) => {
                assert_eq!(msg.body, "");
                assert_eq!(msg.timeout, 5000);
            }
            other => panic!("expected Deliver, got {other:?}"),
        }
    }
}
