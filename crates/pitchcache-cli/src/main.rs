//! pitchcache - drive the offline request-interception layer from a terminal.
//!
//! Runs requests through the same classifier and caching strategies the web
//! app uses, against the real network and an on-disk cache store, and
//! prints every connectivity broadcast as it happens.

mod commands;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pitchcache_core::Config;

/// Log file name used when `--log-dir` is given
const LOG_FILE: &str = "pitchcache.log";

#[derive(Parser, Debug)]
#[command(name = "pitchcache")]
#[command(about = "Offline-first request interception and cache management")]
#[command(version)]
struct Cli {
    /// Path to config file (default: $XDG_CONFIG_HOME/pitchcache/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this directory
    #[arg(long, global = true, env = "PITCHCACHE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Pre-populate the shell compartment for the configured release
    Install,

    /// Purge stale compartments and announce readiness
    Activate {
        /// API host whose data compartment survives (default: from config)
        #[arg(long)]
        api_host: Option<String>,
    },

    /// Send one request through the interceptor
    Fetch {
        url: String,

        /// Treat the request as a full-page navigation
        #[arg(long)]
        navigate: bool,

        #[arg(long, default_value = "GET")]
        method: String,

        /// Accept header to send
        #[arg(long)]
        accept: Option<String>,
    },

    /// List every cache compartment
    List,

    /// Delete every cache compartment
    Clear,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref());

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(Some(&config_path))?;
    info!(release = %config.release_version, origin = %config.origin, "pitchcache starting");

    match cli.command {
        Command::Install => commands::install(&config).await,
        Command::Activate { api_host } => commands::activate(&config, api_host.as_deref()).await,
        Command::Fetch {
            url,
            navigate,
            method,
            accept,
        } => {
            let request = commands::build_request(&url, navigate, &method, accept)?;
            commands::fetch(&config, &config_path, request).await
        }
        Command::List => commands::list(&config).await,
        Command::Clear => commands::clear(&config).await,
    }
}
