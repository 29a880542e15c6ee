//! Receiver-side watch loop
//!
//! One receiver process runs per user and owns its mailbox exclusively as
//! consumer. The lifecycle is a small state machine: wait for the mailbox
//! directory to exist, drain the backlog in filename order, then watch for
//! completed writes until a shutdown signal arrives. Every observed file is
//! dispatched at most once and then consumed; dispatch failure never causes
//! a retry.

mod config;
mod processor;
mod retention;

pub use config::{ReceiverConfig, RetentionMode};
pub use processor::{Disposition, MessageProcessor};
pub use retention::RetentionPolicy;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::dispatch::DispatchBackend;
use crate::watch::DirectoryWatch;

pub struct Receiver {
    base_dir: PathBuf,
    mailbox: PathBuf,
    processor: MessageProcessor,
    retention: RetentionPolicy,
    backend: Box<dyn DispatchBackend>,
    shutdown: watch::Receiver<bool>,
}

impl Receiver {
    pub fn new(
        base_dir: &Path,
        user_name: &str,
        config: ReceiverConfig,
        backend: Box<dyn DispatchBackend>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let mailbox = base_dir.join(user_name);
        let retention = RetentionPolicy::new(&mailbox, &config);
        Self {
            base_dir: base_dir.to_path_buf(),
            mailbox,
            processor: MessageProcessor::new(config),
            retention,
            backend,
            shutdown,
        }
    }

    /// Run the receiver until the shutdown signal fires
    ///
    /// Errors only on unrecoverable watch-primitive failures; everything
    /// per-message is logged and survived.
    pub async fn run(&mut self) -> Result<()> {
        if !self.wait_for_mailbox().await? {
            return Ok(());
        }

        // The live watch is registered before the backlog drain so that
        // files arriving mid-drain are not lost; a file consumed by the
        // drain and then reported by the watch is skipped by the existence
        // check in handle_file.
        let mut live = DirectoryWatch::completed_writes(&self.mailbox)?;
        self.drain_backlog().await;

        info!("watching {} for notifications", self.mailbox.display());
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                batch = live.wait() => {
                    let Some(names) = batch else {
                        bail!("directory watch on {} terminated unexpectedly", self.mailbox.display());
                    };
                    for name in names {
                        if self.shutdown_requested() {
                            return Ok(());
                        }
                        self.handle_file(&name).await;
                    }
                }
            }
        }
        Ok(())
    }

    /// Block until the mailbox directory exists; `false` means shutdown
    ///
    /// Register-then-recheck closes the race between the directory being
    /// created and the watch being installed: a directory that appeared
    /// before registration is seen by the recheck, one that appears after
    /// is seen by the watch.
    async fn wait_for_mailbox(&mut self) -> Result<bool> {
        if self.mailbox.is_dir() {
            return Ok(true);
        }

        info!(
            "mailbox {} does not exist yet, waiting for first delivery",
            self.mailbox.display()
        );
        let mut creations = DirectoryWatch::creations(&self.base_dir)?;
        if self.mailbox.is_dir() {
            return Ok(true);
        }

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.changed() => return Ok(false),
                batch = creations.wait() => {
                    match batch {
                        Some(_) if self.mailbox.is_dir() => return Ok(true),
                        Some(_) => {}
                        None => bail!(
                            "directory watch on {} terminated unexpectedly",
                            self.base_dir.display()
                        ),
                    }
                }
            }
        }
    }

    /// Process everything already in the mailbox, oldest first
    async fn drain_backlog(&mut self) {
        let entries = match std::fs::read_dir(&self.mailbox) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("could not list mailbox {}: {e}", self.mailbox.display());
                return;
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();

        for name in names {
            if self.shutdown_requested() {
                return;
            }
            self.handle_file(&name).await;
        }
    }

    /// Process one mailbox entry and consume it
    ///
    /// Processing is synchronous with respect to the loop: it completes
    /// fully before the next suspension point, so shutdown never leaves a
    /// file half-processed.
    async fn handle_file(&mut self, name: &str) {
        if name.starts_with('.') {
            return;
        }
        let path = self.mailbox.join(name);
        if !path.is_file() {
            // Already consumed during the drain/watch overlap.
            return;
        }

        match self.processor.assess(&path) {
            Disposition::Deliver(message) => {
                if let Err(e) = self.backend.deliver(&message).await {
                    // Fire-and-forget: logged, still acknowledged below.
                    warn!("dispatch failed for {name}: {e}");
                }
            }
            Disposition::Filtered(urgency) => {
                debug!("filtered notification {name} (urgency {urgency})");
            }
            Disposition::Malformed => {}
        }

        self.retention.acknowledge(&path);
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }
}
