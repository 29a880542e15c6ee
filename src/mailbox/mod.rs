//! Sender-side mailbox provisioning and recipient resolution

mod recipients;
mod store;

pub use recipients::{resolve_recipients, Targeting};
pub use store::{make_filename, MailboxStore, ProvisioningError};

use nix::unistd::{Gid, Uid, User};

/// Default base directory for per-user mailboxes
pub const DEFAULT_BASE_DIR: &str = "/var/lib/herald";

/// Name of the per-mailbox archive subdirectory
pub const ARCHIVE_DIR: &str = ".archive";

/// A resolved recipient identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub name: String,
    pub uid: Uid,
    pub gid: Gid,
}

impl From<User> for Recipient {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            uid: user.uid,
            gid: user.gid,
        }
    }
}
