//! Post-delivery retention: delete or archive-with-eviction
//!
//! Acknowledgment is best-effort throughout: a file that cannot be removed
//! or moved is logged and left behind, never allowed to stall the loop.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::config::{ReceiverConfig, RetentionMode};
use crate::mailbox::ARCHIVE_DIR;

pub struct RetentionPolicy {
    mode: RetentionMode,
    archive_dir: PathBuf,
    max_history: usize,
}

impl RetentionPolicy {
    pub fn new(mailbox: &Path, config: &ReceiverConfig) -> Self {
        Self {
            mode: config.retention_mode,
            archive_dir: mailbox.join(ARCHIVE_DIR),
            max_history: config.max_history,
        }
    }

    /// Consume a processed message file
    ///
    /// Called exactly once per observed file, regardless of whether the
    /// message was dispatched, filtered, malformed, or failed to display.
    pub fn acknowledge(&self, path: &Path) {
        match self.mode {
            RetentionMode::Delete => {
                if let Err(e) = fs::remove_file(path) {
                    warn!("could not remove notification {}: {e}", path.display());
                }
            }
            RetentionMode::Archive => self.archive(path),
        }
    }

    fn archive(&self, path: &Path) {
        if let Err(e) = fs::create_dir_all(&self.archive_dir) {
            warn!(
                "could not create archive directory {}: {e}",
                self.archive_dir.display()
            );
        }

        let Some(name) = path.file_name() else {
            warn!("notification path has no file name: {}", path.display());
            return;
        };
        let dest = self.archive_dir.join(name);
        if let Err(e) = fs::rename(path, &dest) {
            warn!("could not archive notification {}: {e}", path.display());
        }

        self.evict();
    }

    /// Delete the oldest archive entries once the bound is exceeded
    fn evict(&self) {
        let entries = match fs::read_dir(&self.archive_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "could not list archive {}: {e}",
                    self.archive_dir.display()
                );
                return;
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
            .collect();
        names.sort();

        let excess = names.len().saturating_sub(self.max_history);
        for name in &names[..excess] {
            let stale = self.archive_dir.join(name);
            if let Err(e) = fs::remove_file(&stale) {
                // Best-effort: one stuck entry must not block the rest.
                warn!("could not evict old notification {}: {e}", stale.display());
            }
        }
    }
}
