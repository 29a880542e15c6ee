//! Low-level directory watch primitive
//!
//! Wraps an inotify-backed [`notify`] watcher behind two narrow interests:
//! "an entry was created in this directory" and "a file write completed in
//! this directory". Events are forwarded into an unbounded channel, so
//! nothing is lost when several arrive before the next `wait` call; batched
//! or out-of-order OS delivery is handled by draining and sorting per wait.

use std::path::{Path, PathBuf};

use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

/// Failure to set up a watch; not recoverable by the caller
#[derive(Error, Debug)]
#[error("failed to watch {path}: {source}")]
pub struct WatchError {
    pub path: PathBuf,
    source: notify::Error,
}

#[derive(Debug, Clone, Copy)]
enum Interest {
    /// Directory entries being created
    Create,
    /// Files whose writer has finished and closed them; partial writes are
    /// never reported
    CloseWrite,
}

fn wanted(kind: &EventKind, interest: Interest) -> bool {
    match interest {
        Interest::Create => matches!(kind, EventKind::Create(_)),
        Interest::CloseWrite => matches!(
            kind,
            EventKind::Access(AccessKind::Close(AccessMode::Write))
        ),
    }
}

/// A watch bound to exactly one directory
///
/// The underlying OS watch is owned by this handle and released when it is
/// dropped, on every exit path.
pub struct DirectoryWatch {
    rx: mpsc::UnboundedReceiver<String>,
    _watcher: RecommendedWatcher,
}

impl DirectoryWatch {
    /// Watch for entries being created directly inside `dir`
    pub fn creations(dir: &Path) -> Result<Self, WatchError> {
        Self::new(dir, Interest::Create)
    }

    /// Watch for file writes completing directly inside `dir`
    pub fn completed_writes(dir: &Path) -> Result<Self, WatchError> {
        Self::new(dir, Interest::CloseWrite)
    }

    fn new(dir: &Path, interest: Interest) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!("watch backend error: {e}");
                    return;
                }
            };
            if !wanted(&event.kind, interest) {
                return;
            }
            for path in event.paths {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    // Receiver gone means we are shutting down; drop the event.
                    let _ = tx.send(name.to_string());
                }
            }
        })
        .map_err(|source| WatchError {
            path: dir.to_path_buf(),
            source,
        })?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError {
                path: dir.to_path_buf(),
                source,
            })?;

        Ok(Self {
            rx,
            _watcher: watcher,
        })
    }

    /// Suspend until at least one event arrives, then drain everything
    /// already queued
    ///
    /// Returns the affected entry names sorted and deduplicated, or `None`
    /// if the watch backend has died.
    pub async fn wait(&mut self) -> Option<Vec<String>> {
        let first = self.rx.recv().await?;
        let mut names = vec![first];
        while let Ok(name) = self.rx.try_recv() {
            names.push(name);
        }
        names.sort();
        names.dedup();
        Some(names)
    }
}
