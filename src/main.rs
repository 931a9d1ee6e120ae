use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

mod bot;
mod config;
mod dashboard;
mod engine;
mod error;
mod logging;
mod models;
mod notify;
mod probe;
mod tracker;
mod utils;
mod vitals;

use crate::config::{ConfigStore, TalonConfig, CONFIG_FILE, DASHBOARD_FILE, HEARTBEAT_FILE};
use crate::engine::Monitor;
use crate::notify::{AlertSink, TelegramClient};
use crate::probe::TcpProbe;
use crate::vitals::SystemVitals;

#[derive(Parser)]
#[command(name = "talon")]
#[command(version, about = "🦅 Talon Handler: homelab service monitoring with Telegram alerts")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Markdown dashboard rewritten every cycle
    #[arg(long, global = true, default_value = DASHBOARD_FILE)]
    dashboard: PathBuf,

    /// Append-only heartbeat and error log
    #[arg(long, global = true, default_value = HEARTBEAT_FILE)]
    heartbeat_log: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the monitoring loop and the Telegram listener
    Monitor,
    /// Show the Telegram binding, or issue a new auth code
    Telegram {
        /// Generate a fresh auth code, invalidating the previous one
        #[arg(long)]
        new: bool,
    },
    /// Show every watched service and whether it is monitored
    Status,
    /// Inspect or toggle monitored ports
    Filter {
        #[command(subcommand)]
        action: FilterAction,
    },
}

#[derive(Subcommand)]
enum FilterAction {
    /// List the watchlist
    List,
    /// Start monitoring a port
    Enable {
        port: u16,
        /// Display name for the service
        #[arg(long)]
        name: Option<String>,
    },
    /// Stop monitoring a port
    Disable { port: u16 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(heartbeat_log_for(&cli.command, &cli.heartbeat_log))?;

    let store = ConfigStore::new(&cli.config);
    match cli.command {
        Commands::Monitor => run_monitor(store, &cli.dashboard).await,
        Commands::Telegram { new } => telegram(&store, new),
        Commands::Status => print_watchlist(&store),
        Commands::Filter { action } => filter(&store, action),
    }
}

/// Only the long-running monitor keeps a heartbeat file; one-shot commands log to the console.
fn heartbeat_log_for<'a>(command: &Commands, path: &'a Path) -> Option<&'a Path> {
    matches!(command, Commands::Monitor).then_some(path)
}

async fn run_monitor(store: ConfigStore, dashboard: &Path) -> Result<()> {
    let config = store
        .load()
        .with_context(|| format!("Failed to read {}", store.path().display()))?;
    let Some(token) = config.token() else {
        bail!(
            "Telegram token not found. Set \"telegram_token\" in {} first.",
            store.path().display()
        );
    };

    let client = TelegramClient::new(token).context("Failed to create Telegram client")?;
    let sink: Arc<dyn AlertSink> = Arc::new(client.clone());
    let mut monitor = Monitor::new(
        store.clone(),
        Arc::new(TcpProbe::default()),
        Some(sink),
        Box::new(SystemVitals::new()),
        dashboard,
    );

    info!("🦅 Talon Eye is watching {} ports...", config.watchlist.enabled_targets().len());

    tokio::select! {
        _ = monitor.run() => {}
        _ = bot::run(client, store) => {}
        res = shutdown_signal() => {
            res?;
            info!("Shutdown signal received. Closing Talon Eye...");
        }
    }
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            res = signal::ctrl_c() => res?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    signal::ctrl_c().await?;
    Ok(())
}

fn telegram(store: &ConfigStore, new: bool) -> Result<()> {
    if new {
        let otp = store.set_otp().context("Failed to store auth code")?;
        println!("New Ghost Auth Code: {}", otp);
        println!("Send it to your bot with: /start {}", otp);
        println!("Previous pending codes have been invalidated.");
        return Ok(());
    }

    let config = store.load()?;
    match (config.chat_id, config.pending_otp.as_deref()) {
        (Some(chat_id), _) => println!("Telegram is bound to Chat ID: {}", chat_id),
        (None, Some(otp)) => println!("Status: Pending Ghost Auth. Active Code: {}", otp),
        (None, None) => println!("Status: Not bound. Run `talon telegram --new` to get a code."),
    }
    Ok(())
}

fn filter(store: &ConfigStore, action: FilterAction) -> Result<()> {
    match action {
        FilterAction::List => print_watchlist(store)?,
        FilterAction::Enable { port, name } => {
            store.set_enabled(port, true, name)?;
            println!("Port {} enabled.", port);
        }
        FilterAction::Disable { port } => {
            store.set_enabled(port, false, None)?;
            println!("Port {} disabled.", port);
        }
    }
    Ok(())
}

fn print_watchlist(store: &ConfigStore) -> Result<()> {
    let config = store.load()?;
    print!("{}", watchlist_table(&config));
    Ok(())
}

fn watchlist_table(config: &TalonConfig) -> String {
    if config.watchlist.is_empty() {
        return "No services in watchlist. Add one with `talon filter enable <port>`.\n".to_string();
    }
    let mut table = format!("{:<8} {:<28} {}\n", "PORT", "SERVICE", "STATE");
    for target in config.watchlist.targets() {
        let state = if target.enabled { "ENABLED" } else { "DISABLED" };
        table.push_str(&format!("{:<8} {:<28} {}\n", target.port, target.display_name, state));
    }
    table
}
