//! Config commands.

use std::path::PathBuf;

use clap::Subcommand;
use console::style;
use dialoguer::Confirm;

use et_core::config::{AppConfig, ConfigHandle};
use et_core::error::{EtError, EtResult};

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Write a configuration file with default values.
    Init {
        /// Gateway URL to store (http/https are mapped to ws/wss).
        #[arg(long)]
        url: Option<String>,
        /// Overwrite an existing file without asking.
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration file path.
    Path,
}

fn config_path(explicit: Option<PathBuf>) -> EtResult<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => AppConfig::default_config_path(),
    }
}

pub async fn run(
    config: ConfigHandle,
    action: ConfigAction,
    explicit_path: Option<PathBuf>,
    format: OutputFormat,
) -> EtResult<()> {
    match action {
        ConfigAction::Show => {
            let cfg = config.read().await;
            match format {
                OutputFormat::Json => {
                    let out = serde_json::to_string_pretty(&*cfg)?;
                    println!("{out}");
                }
                OutputFormat::Text => {
                    let out = toml::to_string_pretty(&*cfg)
                        .map_err(|e| EtError::Config(format!("failed to render config: {e}")))?;
                    println!("{out}");
                    if let Err(e) = cfg.realtime.validate() {
                        println!("  {} {e}", style("WARN").yellow().bold());
                    }
                }
            }
        }
        ConfigAction::Init { url, force } => {
            let path = config_path(explicit_path)?;
            if path.exists() && !force {
                let overwrite = Confirm::new()
                    .with_prompt(format!("{} exists. Overwrite?", path.display()))
                    .default(false)
                    .interact()
                    .map_err(|e| EtError::Internal(e.to_string()))?;
                if !overwrite {
                    println!("  Left {} unchanged.", path.display());
                    return Ok(());
                }
            }

            let mut cfg = AppConfig::default();
            if let Some(url) = url {
                cfg.realtime.url = AppConfig::sanitize_socket_url(&url);
            }
            cfg.realtime.validate()?;
            cfg.save_to_file(&path)?;
            println!(
                "  {} Config written to {}",
                style("OK").green().bold(),
                path.display()
            );
        }
        ConfigAction::Path => {
            let path = config_path(explicit_path)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "path": path })),
                OutputFormat::Text => println!("{}", path.display()),
            }
        }
    }
    Ok(())
}
