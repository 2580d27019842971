//! # Main Entry Point
//!
//! Initializes the webhook service:
//! - Domain: Configuration and Types
//! - Infrastructure: Spreadsheet backend
//! - Application: Classifier, Logbook, Roster, Processor
//! - Interface: HTTP routes
//!

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::application::processor::InboundProcessor;
use crate::domain::config::{AppConfig, DEFAULT_CONFIG_PATH};
use crate::interface::http::{AppState, router};
use crate::strings::logs;

/// Inbound SMS webhook that logs messages to a spreadsheet and handles opt-out keywords.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, env = "OPTOUT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Address to listen on (overrides config and PORT)
    #[arg(long)]
    bind: Option<String>,

    /// Keep spreadsheet writes in memory
    #[arg(long)]
    dry_run: bool,

    /// Directory for daily rolling log files
    #[arg(long)]
    log_dir: Option<String>,
}

const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load Configuration
    let mut config = AppConfig::load(&cli.config)?;
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if cli.dry_run {
        config.sheets.dry_run = true;
    }
    if let Some(dir) = cli.log_dir {
        config.logging.dir = Some(dir);
    }

    // 2. Logging Setup
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config.logging.level.as_deref().map(str::to_lowercase);
        tracing_subscriber::EnvFilter::new(match level {
            Some(level) => format!("{level},hyper=warn,reqwest=warn"),
            None => DEFAULT_FILTER.to_string(),
        })
    });

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    // Guard must outlive the server so buffered lines get flushed.
    let mut _file_guard = None;
    let file_layer = match &config.logging.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("Failed to create log directory {dir}"))?;
            let appender = tracing_appender::rolling::daily(dir, "optout-webhook.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            _file_guard = Some(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("{}", logs::STARTING);

    config.validate()?;
    if config.sheets.dry_run {
        tracing::warn!("{}", logs::DRY_RUN);
    }

    // 3. Initialize Infrastructure
    let store = infrastructure::sheets::connect(&config.sheets)?;

    // 4. Initialize Application Components
    let processor = Arc::new(InboundProcessor::new(&config, store));
    let state = AppState::new(&config, processor);

    // 5. Serve
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!("{}", logs::listening(&config.server.bind));

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("{}", logs::SHUTDOWN);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("{}", logs::shutdown_fail(&e.to_string()));
        // Without a signal handler, keep serving until the process is killed.
        std::future::pending::<()>().await;
    }
}
