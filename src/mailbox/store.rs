//! Mailbox provisioning and message file writing
//!
//! The privilege boundary is crossed here: a root sender drops files into a
//! directory owned by the recipient. Messages are never mutated; every write
//! targets a fresh, uniquely named file, so concurrent senders need no
//! locking and the sole consumer can delete or archive at will.

use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, warn};

use super::{Recipient, ARCHIVE_DIR};
use crate::message::Message;

/// Errors raised while provisioning a mailbox or writing into it
#[derive(Error, Debug)]
pub enum ProvisioningError {
    #[error("filesystem operation on {path} failed: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to set ownership on {path}: {source}")]
    Chown { path: PathBuf, source: nix::Error },
}

/// Generate a unique, chronologically sortable message filename
///
/// `<seconds>.<microseconds>_<4-hex-random>.json`: lexicographic order
/// matches arrival order, and the random suffix keeps names distinct even
/// when concurrent senders write in the same microsecond.
pub fn make_filename() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let rand: u16 = rand::random();
    format!("{}.{:06}_{:04x}.json", now.as_secs(), now.subsec_micros(), rand)
}

/// Writes notification files into per-recipient mailbox directories
pub struct MailboxStore {
    base_dir: PathBuf,
}

impl MailboxStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Idempotently create and secure the recipient's mailbox directory
    ///
    /// Creates `<base>/<name>` and its archive subdirectory, chowns them to
    /// the recipient and chmods 0700. Ownership changes are skipped when the
    /// directory is already correct, so repeated calls never fail on an
    /// already-provisioned mailbox.
    pub fn ensure_mailbox(&self, recipient: &Recipient) -> Result<PathBuf, ProvisioningError> {
        let user_dir = self.base_dir.join(&recipient.name);
        let archive_dir = user_dir.join(ARCHIVE_DIR);

        for dir in [&user_dir, &archive_dir] {
            fs::create_dir_all(dir).map_err(|source| ProvisioningError::Io {
                path: dir.clone(),
                source,
            })?;
            chown_if_needed(dir, recipient)?;
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700)).map_err(|source| {
                ProvisioningError::Io {
                    path: dir.clone(),
                    source,
                }
            })?;
        }

        Ok(user_dir)
    }

    /// Write the message to each recipient's mailbox
    ///
    /// Recipients are handled independently: a provisioning or write failure
    /// for one is logged and does not affect the others. Returns the number
    /// of fully successful writes.
    pub fn send(&self, message: &Message, recipients: &[Recipient]) -> usize {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("failed to encode message: {e}");
                return 0;
            }
        };

        let mut count = 0;
        for recipient in recipients {
            match self.send_one(&payload, recipient) {
                Ok(path) => {
                    debug!("delivered to {}: {}", recipient.name, path.display());
                    count += 1;
                }
                Err(e) => {
                    warn!("failed to send notification to {}: {e}", recipient.name);
                }
            }
        }
        count
    }

    fn send_one(&self, payload: &str, recipient: &Recipient) -> Result<PathBuf, ProvisioningError> {
        let user_dir = self.ensure_mailbox(recipient)?;
        let path = user_dir.join(make_filename());
        fs::write(&path, payload).map_err(|source| ProvisioningError::Io {
            path: path.clone(),
            source,
        })?;
        chown_if_needed(&path, recipient)?;
        Ok(path)
    }
}

fn chown_if_needed(path: &Path, recipient: &Recipient) -> Result<(), ProvisioningError> {
    let meta = fs::metadata(path).map_err(|source| ProvisioningError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if meta.uid() == recipient.uid.as_raw() && meta.gid() == recipient.gid.as_raw() {
        return Ok(());
    }
    nix::unistd::chown(path, Some(recipient.uid), Some(recipient.gid)).map_err(|source| {
        ProvisioningError::Chown {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Urgency;
    use nix::unistd::{geteuid, User};
    use std::collections::HashSet;

    fn current_user() -> Recipient {
        Recipient::from(User::from_uid(geteuid()).unwrap().unwrap())
    }

    fn sample_message() -> Message {
        Message {
            title: "hello".to_string(),
            body: "world".to_string(),
            urgency: Urgency::Normal,
            icon: "".to_string(),
            timeout: -1,
        }
    }

    #[test]
    fn test_make_filename_unique_and_well_formed() {
        let names: HashSet<String> = (0..1000).map(|_| make_filename()).collect();
        assert_eq!(names.len(), 1000);

        for name in &names {
            let stem = name.strip_suffix(".json").expect("missing .json suffix");
            let (timestamp, rand) = stem.split_once('_').expect("missing underscore");
            let (secs, micros) = timestamp.split_once('.').expect("missing dot");
            secs.parse::<u64>().expect("seconds not numeric");
            assert_eq!(micros.len(), 6);
            micros.parse::<u32>().expect("microseconds not numeric");
            assert_eq!(rand.len(), 4);
            assert!(rand.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_ensure_mailbox_is_idempotent() {
        let base = tempfile::tempdir().unwrap();
        let store = MailboxStore::new(base.path());
        let me = current_user();

        let first = store.ensure_mailbox(&me).unwrap();
        let second = store.ensure_mailbox(&me).unwrap();
        assert_eq!(first, second);

        let meta = fs::metadata(&first).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o700);
        assert_eq!(meta.uid(), me.uid.as_raw());
        assert_eq!(meta.gid(), me.gid.as_raw());
        assert!(first.join(ARCHIVE_DIR).is_dir());
    }

    #[test]
    fn test_send_writes_one_file_per_recipient() {
        let base = tempfile::tempdir().unwrap();
        let store = MailboxStore::new(base.path());
        let me = current_user();
        let message = sample_message();

        assert_eq!(store.send(&message, &[me.clone()]), 1);

        let entries: Vec<_> = fs::read_dir(base.path().join(&me.name))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert_eq!(entries.len(), 1);

        let written: Message =
            serde_json::from_str(&fs::read_to_string(entries[0].path()).unwrap()).unwrap();
        assert_eq!(written, message);
    }

    #[test]
    fn test_partial_send_counts_only_successes() {
        let base = tempfile::tempdir().unwrap();
        let store = MailboxStore::new(base.path());
        let me = current_user();

        // A regular file where the second recipient's mailbox directory
        // should go makes provisioning fail for that recipient only.
        fs::write(base.path().join("blocked"), "not a directory").unwrap();
        let blocked = Recipient {
            name: "blocked".to_string(),
            uid: me.uid,
            gid: me.gid,
        };

        let count = store.send(&sample_message(), &[me.clone(), blocked]);
        assert_eq!(count, 1);

        let entries: Vec<_> = fs::read_dir(base.path().join(&me.name))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert_eq!(entries.len(), 1);
    }
}
