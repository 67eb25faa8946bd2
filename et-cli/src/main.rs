//! EusoTrip realtime CLI.
//!
//! Connects to the realtime gateway from a terminal: watch live events for an
//! identity, inspect the channels a role is subscribed to, and manage the
//! configuration file.

mod commands;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::debug;

use et_core::config::{AppConfig, ConfigHandle};
use et_core::error::EtResult;
use et_core::logging;
use et_core::platform::Platform;

/// EusoTrip realtime client.
#[derive(Parser)]
#[command(
    name = "eusotrip-rt",
    version,
    about = "EusoTrip realtime event client",
    long_about = "Command-line client for the EusoTrip realtime gateway.\n\
                  Authenticate as a marketplace user and stream the events routed to them."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// One JSON document per line, for scripting.
    Json,
}

/// Identity flags shared by commands that act as a user.
#[derive(Debug, Clone, clap::Args)]
pub struct IdentityArgs {
    /// User id (defaults to identity.user_id from config).
    #[arg(short, long)]
    pub user: Option<String>,
    /// Marketplace role, e.g. DRIVER or BROKER (defaults to identity.role).
    #[arg(short, long)]
    pub role: Option<String>,
    /// Company id (defaults to identity.company_id).
    #[arg(long)]
    pub company: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect, authenticate and print every event until Ctrl+C.
    Listen {
        #[command(flatten)]
        identity: IdentityArgs,
        /// Extra channel to subscribe to (repeatable).
        #[arg(long = "channel")]
        channels: Vec<String>,
        /// Gateway URL (overrides config).
        #[arg(long)]
        url: Option<String>,
        /// Only print events of these categories (e.g. tracking, marketplace).
        #[arg(long = "category")]
        categories: Vec<String>,
    },
    /// Show the channels subscribed automatically for an identity.
    Channels {
        #[command(flatten)]
        identity: IdentityArgs,
    },
    /// Show or initialise the configuration file.
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn load_config(path: Option<&Path>) -> EtResult<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load_default(),
    }
}

#[tokio::main]
async fn main() -> EtResult<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let mut log_config = config.logging.clone();
    if cli.verbose {
        log_config.level = "debug".to_string();
    }
    let log_dir = config.effective_log_dir().ok();
    let _guard = logging::init_logging(&log_config, log_dir.as_deref())?;
    debug!(
        "{} CLI v{} on {}",
        et_core::constants::APP_NAME,
        et_core::constants::APP_VERSION,
        Platform::current()
    );

    let config = ConfigHandle::new(config);

    match cli.command {
        Commands::Listen {
            identity,
            channels,
            url,
            categories,
        } => commands::listen::run(config, identity, channels, url, categories, cli.format).await,
        Commands::Channels { identity } => {
            commands::channels::run(config, identity, cli.format).await
        }
        Commands::Config { action } => {
            commands::config::run(config, action, cli.config, cli.format).await
        }
    }
}
