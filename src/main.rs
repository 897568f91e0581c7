//! Channel Copy Bot - Main Entry Point
//!
//! A Telegram userbot that watches a source channel and copies every new
//! post to a target channel after a configurable delay.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

use channel_copy_bot::config::{SessionPaths, TelegramConfig};
use channel_copy_bot::forward::StopReason;
use channel_copy_bot::runner::{self, RunOptions};
use channel_copy_bot::setup::{ConsolePrompter, SetupError, prompt_session_name};
use channel_copy_bot::telegram::TelegramBot;

/// Telegram userbot that copies new channel posts to another channel.
#[derive(Parser, Debug)]
#[command(name = "channel_copy_bot")]
#[command(about = "Copy new posts from one Telegram channel to another")]
#[command(version)]
struct Args {
    /// Session name (asked interactively when omitted).
    #[arg(short, long)]
    session: Option<String>,

    /// Directory holding one sub-directory per session.
    #[arg(long, default_value = "sessions")]
    sessions_dir: PathBuf,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Ask for source, target and delay again even if already configured.
    #[arg(long)]
    reconfigure: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    println!("🤖 channel_copy_bot v{}", env!("CARGO_PKG_VERSION"));
    println!("{}", "=".repeat(40));

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let tg_config = TelegramConfig::from_env()
        .context("API_ID and API_HASH must be set in the environment or .env file")?;

    // Ctrl+C is observed from here on, including while a prompt is open.
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(watch_ctrl_c(stop_tx));

    let mut prompter = ConsolePrompter::new();

    let session_name = match &args.session {
        Some(name) => name.clone(),
        None => match or_interrupt(prompt_session_name(&mut prompter), &stop_rx).await {
            None | Some(Err(SetupError::Interrupted)) => farewell(),
            Some(name) => name?,
        },
    };

    let paths = SessionPaths::new(&args.sessions_dir, &session_name)
        .context("Invalid session name")?;
    paths
        .ensure_dir()
        .with_context(|| format!("Failed to create {}", paths.dir().display()))?;

    let Some(connected) =
        or_interrupt(TelegramBot::connect(&tg_config, &paths.session_file()), &stop_rx).await
    else {
        farewell();
    };
    let bot = Arc::new(connected.context("Failed to connect to Telegram")?);

    let options = RunOptions {
        reconfigure: args.reconfigure,
    };
    let result = runner::run(
        Arc::clone(&bot),
        &paths,
        &mut prompter,
        options,
        interrupted(stop_rx),
    )
    .await;

    // Cleanup
    bot.disconnect();

    match result {
        Ok(StopReason::Interrupted) => farewell(),
        Ok(StopReason::Disconnected) => {
            warn!("Disconnected from Telegram");
            Ok(())
        }
        Err(e) => {
            error!("Fatal error: {}", e);
            Err(e.into())
        }
    }
}

/// Raises the stop flag on Ctrl+C.
async fn watch_ctrl_c(stop: watch::Sender<bool>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            let _ = stop.send(true);
        }
        // Dropping the sender leaves `interrupted` pending forever.
        Err(e) => warn!("Could not listen for Ctrl+C: {}", e),
    }
}

/// Completes once the stop flag is raised.
async fn interrupted(mut stop: watch::Receiver<bool>) {
    if stop.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Runs `fut` unless Ctrl+C comes first.
async fn or_interrupt<T>(fut: impl Future<Output = T>, stop: &watch::Receiver<bool>) -> Option<T> {
    tokio::select! {
        value = fut => Some(value),
        () = interrupted(stop.clone()) => None,
    }
}

/// Says goodbye and exits.
///
/// The process exits directly because an abandoned console prompt may still
/// be blocked reading stdin on the blocking pool.
fn farewell() -> ! {
    println!("\n💤 Shutting down");
    std::process::exit(0);
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
