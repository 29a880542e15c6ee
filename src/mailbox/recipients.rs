//! Resolution of targeting requests into a deduplicated recipient set

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Result};
use nix::unistd::{Group, User};
use tracing::warn;

use super::Recipient;

/// Shells that indicate a non-login/service account
const NOLOGIN_SHELLS: &[&str] = &[
    "/usr/sbin/nologin",
    "/sbin/nologin",
    "/bin/false",
    "/usr/bin/false",
];

/// First uid conventionally assigned to human users
const MIN_HUMAN_UID: u32 = 1000;

/// A validated targeting request: exactly one mode
#[derive(Debug, Clone)]
pub enum Targeting {
    Users(Vec<String>),
    Groups(Vec<String>),
    Everyone { include_nologin: bool },
}

impl Targeting {
    /// Build a targeting request from CLI-style flags
    ///
    /// Fails fast, before any I/O, when no mode or more than one mode is
    /// given.
    pub fn from_flags(
        users: Vec<String>,
        groups: Vec<String>,
        everyone: bool,
        include_nologin: bool,
    ) -> Result<Self> {
        let modes = [!users.is_empty(), !groups.is_empty(), everyone]
            .iter()
            .filter(|m| **m)
            .count();
        if modes == 0 {
            bail!("no targeting mode specified");
        }
        if modes > 1 {
            bail!("only one targeting mode may be used at a time");
        }

        if !users.is_empty() {
            Ok(Targeting::Users(users))
        } else if !groups.is_empty() {
            Ok(Targeting::Groups(groups))
        } else {
            Ok(Targeting::Everyone { include_nologin })
        }
    }
}

/// Resolve a targeting request to a deduplicated recipient list
///
/// Unresolvable names are logged and skipped; an empty result is an error,
/// so nothing is ever sent for a request that matched no one.
pub fn resolve_recipients(targeting: &Targeting, base_dir: &Path) -> Result<Vec<Recipient>> {
    let mut seen: BTreeMap<String, Recipient> = BTreeMap::new();

    match targeting {
        Targeting::Users(names) => {
            for name in names {
                if let Some(recipient) = lookup_user(name) {
                    seen.entry(recipient.name.clone()).or_insert(recipient);
                }
            }
        }

        Targeting::Groups(names) => {
            for group_name in names {
                let group = match Group::from_name(group_name) {
                    Ok(Some(group)) => group,
                    Ok(None) => {
                        warn!("unknown group: {group_name} (skipping)");
                        continue;
                    }
                    Err(e) => {
                        warn!("group lookup failed for {group_name}: {e} (skipping)");
                        continue;
                    }
                };
                for member in &group.mem {
                    if let Some(recipient) = lookup_user(member) {
                        seen.entry(recipient.name.clone()).or_insert(recipient);
                    }
                }
            }
        }

        Targeting::Everyone { include_nologin } => {
            for recipient in human_users() {
                seen.entry(recipient.name.clone()).or_insert(recipient);
            }
            // Union with anyone who already has a mailbox; whether owners
            // without a login shell count is a configurable inclusion rule.
            for recipient in mailbox_owners(base_dir, *include_nologin) {
                seen.entry(recipient.name.clone()).or_insert(recipient);
            }
        }
    }

    if seen.is_empty() {
        bail!("no valid recipients found");
    }
    Ok(seen.into_values().collect())
}

fn lookup_user(name: &str) -> Option<Recipient> {
    match User::from_name(name) {
        Ok(Some(user)) => Some(Recipient::from(user)),
        Ok(None) => {
            warn!("unknown user: {name} (skipping)");
            None
        }
        Err(e) => {
            warn!("user lookup failed for {name}: {e} (skipping)");
            None
        }
    }
}

/// All human users: uid >= 1000 with a login shell
fn human_users() -> Vec<Recipient> {
    let passwd = match std::fs::read_to_string("/etc/passwd") {
        Ok(passwd) => passwd,
        Err(e) => {
            warn!("could not read /etc/passwd: {e}");
            return Vec::new();
        }
    };

    passwd
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 7 {
                return None;
            }
            let uid: u32 = fields[2].parse().ok()?;
            if uid < MIN_HUMAN_UID || NOLOGIN_SHELLS.contains(&fields[6]) {
                return None;
            }
            lookup_user(fields[0])
        })
        .collect()
}

/// Users who already have a mailbox directory under `base_dir`
fn mailbox_owners(base_dir: &Path, include_nologin: bool) -> Vec<Recipient> {
    let entries = match std::fs::read_dir(base_dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                return None;
            }
            let user = User::from_name(&name).ok().flatten()?;
            if !include_nologin && NOLOGIN_SHELLS.contains(&user.shell.to_string_lossy().as_ref()) {
                return None;
            }
            Some(Recipient::from(user))
        })
        .collect()
}
