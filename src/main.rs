//! signal-relay binary
//!
//! Commands:
//! - `run`: poll the signal backend and relay alerts until Ctrl-C
//! - `test-notify`: send one test alert through Telegram and exit

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use signal_relay::clock::SystemClock;
use signal_relay::config::AppConfig;
use signal_relay::notify::{Alert, DispatchOutcome, NotificationDispatcher, TelegramNotifier};
use signal_relay::poller::{ChartSettings, Poller, PollerHandle};
use signal_relay::source::HttpSignalSource;
use signal_relay::synthetic::SyntheticGenerator;

#[derive(Parser)]
#[command(
    name = "signal-relay",
    about = "Polls trading signals and relays active ones to Telegram"
)]
struct Cli {
    /// Emit JSON log lines (overrides logging.json).
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the backend and relay alerts (default).
    Run,
    /// Send a single test alert and exit.
    TestNotify,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn telegram_notifier(config: &AppConfig) -> Result<TelegramNotifier> {
    let (token, chat_id) = config.telegram_credentials()?;
    let notifier = TelegramNotifier::new(
        config.telegram.api_base.clone(),
        token,
        chat_id,
        Duration::from_millis(config.telegram.request_timeout_ms),
    )?;
    Ok(notifier)
}

async fn run(config: AppConfig) -> Result<()> {
    let poll = config.poll_config()?;
    let source = HttpSignalSource::new(
        config.backend.base_url.clone(),
        Duration::from_millis(config.backend.request_timeout_ms),
    )?;
    let notifier = telegram_notifier(&config)?;

    let poller = Poller::new(
        Box::new(source),
        Box::new(notifier),
        Arc::new(SystemClock),
        SyntheticGenerator::new(),
        ChartSettings::from(&config.synthetic),
    );
    let handle = poller.start(poll);

    wait_for_exit(&handle).await?;

    info!("🛑 Shutting down");
    let last = handle.state();
    handle.shutdown().await.context("Poller task failed")?;
    info!(
        cycles = last.cycles,
        total_signals = last.stats.total_signals,
        "Final state"
    );
    Ok(())
}

/// Block until Ctrl-C; SIGHUP reloads the polling section
#[cfg(unix)]
async fn wait_for_exit(handle: &PollerHandle) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                return Ok(());
            }
            _ = hangup.recv() => reload(handle),
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_exit(_handle: &PollerHandle) -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

#[cfg(unix)]
fn reload(handle: &PollerHandle) {
    let next = AppConfig::load().and_then(|c| c.poll_config());
    match next.and_then(|poll| handle.reconfigure(poll)) {
        Ok(true) => info!(config = ?handle.config(), "🔄 Configuration reloaded"),
        Ok(false) => info!("Configuration reloaded, nothing changed"),
        Err(e) => error!(error = %e, "Configuration reload rejected"),
    }
}

async fn test_notify(config: AppConfig) -> Result<()> {
    let poll = config.poll_config()?;
    let notifier = telegram_notifier(&config)?;
    let mut dispatcher = NotificationDispatcher::new(Box::new(notifier), Arc::new(SystemClock));

    let alert = Alert::test(&poll.instrument, poll.timeframe);
    match dispatcher.dispatch(&alert, poll.cooldown()).await {
        DispatchOutcome::Sent => {
            info!(text = %alert.text(), "✅ Test notification sent");
            Ok(())
        }
        outcome => {
            warn!(?outcome, "Test notification not delivered");
            bail!("test notification not delivered: {outcome:?}")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    init_tracing(cli.json_logs || config.logging.json);

    config.validate()?;
    info!(config = %config, "🚀 Starting signal-relay");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::TestNotify => test_notify(config).await,
    }
}
