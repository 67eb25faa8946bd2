//! Listen command - hold a realtime connection open and print what arrives.

use std::time::Duration;

use chrono::Local;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use et_core::config::{AppConfig, ConfigHandle};
use et_core::constants::RECONNECT_EXHAUSTED_MESSAGE;
use et_core::error::EtResult;
use et_realtime::{ClientOptions, ConnectionState, EventType, RealtimeClient};

use crate::{IdentityArgs, OutputFormat};

enum Line {
    State(ConnectionState),
    Event {
        event_type: EventType,
        channel: Option<String>,
        data: Value,
    },
}

/// Normalise `--category` values to the lowercase category names.
fn category_filter(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect()
}

fn wanted(filter: &[String], event_type: &EventType) -> bool {
    if filter.is_empty() {
        return true;
    }
    let category = format!("{:?}", event_type.category()).to_lowercase();
    filter.iter().any(|f| *f == category)
}

fn print_line(line: &Line, format: OutputFormat) {
    let now = Local::now().format("%H:%M:%S");
    match (line, format) {
        (Line::State(state), OutputFormat::Json) => {
            println!("{}", json!({ "kind": "state", "state": state }));
        }
        (Line::State(state), OutputFormat::Text) => {
            let label = if state.is_connected {
                style(state.to_string()).green()
            } else if state.reconnect_attempts > 0 {
                style(state.to_string()).yellow()
            } else {
                style(state.to_string()).red()
            };
            println!("  {} {} {label}", style(now).dim(), style("STATE").bold());
        }
        (Line::Event { event_type, channel, data }, OutputFormat::Json) => {
            println!(
                "{}",
                json!({ "kind": "event", "type": event_type, "channel": channel, "data": data })
            );
        }
        (Line::Event { event_type, channel, data }, OutputFormat::Text) => {
            let tag = format!("[{event_type}]");
            let tag = if event_type.is_alert() {
                style(tag).red().bold()
            } else if event_type.is_unknown() {
                style(tag).magenta()
            } else {
                style(tag).cyan()
            };
            let channel = channel
                .as_deref()
                .map(|c| format!("{} ", style(c).dim()))
                .unwrap_or_default();
            println!(
                "  {} {tag} {channel}{}",
                style(now).dim(),
                super::truncate(&data.to_string(), 160)
            );
        }
    }
}

/// Run the listen command.
///
/// `--channel` subscriptions are issued once the first `auth_success`
/// arrives; the client replays them after every reconnect.
pub async fn run(
    config: ConfigHandle,
    identity_args: IdentityArgs,
    channels: Vec<String>,
    url: Option<String>,
    categories: Vec<String>,
    format: OutputFormat,
) -> EtResult<()> {
    let identity = super::resolve_identity(&config, identity_args).await?;

    let mut settings = config.read().await.realtime.clone();
    if let Some(url) = url {
        settings.url = AppConfig::sanitize_socket_url(&url);
    }
    let options = ClientOptions::from_settings(&settings)?;
    let reconnect_enabled = options.reconnect.enabled;
    let client = RealtimeClient::new(options);

    let filter = category_filter(&categories);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let event_tx = tx.clone();
    let _events = client.on_any(move |frame| {
        let heartbeat = matches!(frame.event_type, EventType::Ping | EventType::Pong);
        if heartbeat || !wanted(&filter, &frame.event_type) {
            return;
        }
        let _ = event_tx.send(Line::Event {
            event_type: frame.event_type.clone(),
            channel: frame.channel.clone(),
            data: frame.data.clone(),
        });
    });

    let state_tx = tx.clone();
    let _state = client.on_state_change(move |state| {
        let _ = state_tx.send(Line::State(state.clone()));
    });
    drop(tx);
    debug!("registered {} handler(s)", client.total_listeners());

    let mut extra_channels = channels;

    let spinner = (format == OutputFormat::Text).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Connecting to {} as {identity}...", settings.url));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let connected = client.connect(identity).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    match connected {
        Ok(()) => {
            if format == OutputFormat::Text {
                println!(
                    "  {} Connected. Listening for events... (Ctrl+C to stop)\n",
                    style("OK").green().bold()
                );
            }
        }
        Err(e) if reconnect_enabled => {
            warn!("initial connect failed: {e}");
            if format == OutputFormat::Text {
                println!("  {} {e}; retrying in the background", style("WARN").yellow().bold());
            }
        }
        Err(e) => {
            println!("  {} {e}", style("FAIL").red().bold());
            return Err(e);
        }
    }

    loop {
        tokio::select! {
            line = rx.recv() => {
                let Some(line) = line else { break };
                print_line(&line, format);
                if let Line::State(state) = &line {
                    if state.is_authenticated {
                        for channel in std::mem::take(&mut extra_channels) {
                            client.subscribe(channel);
                        }
                    }
                    let exhausted = !state.is_connected
                        && state.error.as_deref() == Some(RECONNECT_EXHAUSTED_MESSAGE);
                    if exhausted {
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if format == OutputFormat::Text {
                    println!("\n  Disconnecting...");
                }
                break;
            }
        }
    }

    client.disconnect().await;
    Ok(())
}
