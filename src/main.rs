use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use herald::dispatch;
use herald::mailbox::{resolve_recipients, MailboxStore, Targeting, DEFAULT_BASE_DIR};
use herald::message::{Message, Urgency};
use herald::receiver::{Receiver, ReceiverConfig};

/// Herald - secure desktop notifications from root to user sessions
#[derive(Parser)]
#[command(name = "herald")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Base mailbox directory
    #[arg(long, env = "HERALD_BASE_DIR", default_value = DEFAULT_BASE_DIR)]
    base_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a notification (requires root)
    Send {
        /// Notification title
        title: String,
        /// Notification body
        #[arg(default_value = "")]
        body: String,
        /// Urgency level
        #[arg(long, value_enum, default_value_t = Urgency::Normal)]
        urgency: Urgency,
        /// FreeDesktop icon name
        #[arg(long, default_value = "")]
        icon: String,
        /// Display timeout in ms (-1 = backend default, 0 = persistent)
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        timeout: i32,
        /// Send to specific users
        #[arg(long, num_args = 1.., value_name = "USER")]
        users: Vec<String>,
        /// Send to all members of Unix groups
        #[arg(long, num_args = 1.., value_name = "GROUP")]
        groups: Vec<String>,
        /// Send to all human users
        #[arg(long)]
        everyone: bool,
        /// With --everyone, also include mailbox owners without a login shell
        #[arg(long, requires = "everyone")]
        include_nologin: bool,
    },
    /// Watch for and display notifications
    Receive,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Send {
            title,
            body,
            urgency,
            icon,
            timeout,
            users,
            groups,
            everyone,
            include_nologin,
        } => {
            let message = Message {
                title,
                body,
                urgency,
                icon,
                timeout,
            };
            run_send(cli.base_dir, message, users, groups, everyone, include_nologin)
        }
        Commands::Receive => run_receive(cli.base_dir),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

fn run_send(
    base_dir: PathBuf,
    message: Message,
    users: Vec<String>,
    groups: Vec<String>,
    everyone: bool,
    include_nologin: bool,
) -> Result<()> {
    if !nix::unistd::geteuid().is_root() {
        bail!("herald send: must be run as root");
    }

    let targeting = Targeting::from_flags(users, groups, everyone, include_nologin)?;
    let recipients = resolve_recipients(&targeting, &base_dir)?;

    let store = MailboxStore::new(base_dir);
    let count = store.send(&message, &recipients);
    println!("Sent to {count} user(s)");
    Ok(())
}

fn run_receive(base_dir: PathBuf) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let config = ReceiverConfig::load();
        let backend = dispatch::from_config(config.backend, config.command.clone())?;

        let user = nix::unistd::User::from_uid(nix::unistd::geteuid())
            .context("failed to look up current user")?
            .context("current uid has no passwd entry")?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        tokio::spawn(async move {
            wait_for_signal().await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        });

        let mut receiver = Receiver::new(&base_dir, &user.name, config, backend, shutdown_rx);
        receiver.run().await
    })
}

/// Resolve on SIGINT or SIGTERM
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).ok();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = async {
            match sigterm.as_mut() {
                Some(sigterm) => {
                    sigterm.recv().await;
                }
                None => std::future::pending().await,
            }
        } => {}
    }
}
