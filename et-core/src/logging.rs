//! Structured logging setup using the `tracing` ecosystem.
//!
//! Driven by the `[logging]` config section. A bare level such as `debug`
//! applies to this workspace's crates only, dependencies stay at `warn`; a
//! full filter directive is used as given. `RUST_LOG` overrides both.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::constants::LOG_FILE_NAME;
use crate::error::{EtError, EtResult};

/// Tracing targets of the workspace crates, including the CLI binary.
const WORKSPACE_TARGETS: &[&str] = &["et_core", "et_realtime", "eusotrip_rt"];

/// Level applied to everything outside the workspace when a bare level is configured.
const DEPENDENCY_LEVEL: &str = "warn";

/// Expand a configured level into an `EnvFilter` directive.
///
/// `"debug"` becomes `"warn,et_core=debug,et_realtime=debug,eusotrip_rt=debug"`
/// so a verbose run is not flooded by tungstenite internals. Anything that is
/// not a bare level (e.g. `"info,et_realtime::supervisor=trace"`) passes
/// through untouched.
pub fn filter_directive(level: &str) -> String {
    let level = level.trim();
    let level = if level.is_empty() { "info" } else { level };
    if level.parse::<LevelFilter>().is_err() {
        return level.to_string();
    }

    let mut directives = vec![DEPENDENCY_LEVEL.to_string()];
    directives.extend(
        WORKSPACE_TARGETS
            .iter()
            .map(|target| format!("{target}={}", level.to_lowercase())),
    );
    directives.join(",")
}

fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(filter_directive(level))
        .unwrap_or_else(|_| EnvFilter::new(filter_directive("info")))
}

/// Initialize the global tracing subscriber from the `[logging]` section.
///
/// Console output always goes to stderr. When `config.file_output` is set
/// and a directory is known, a daily-rotated file is written there too, in
/// JSON when `config.json_output` is set.
///
/// # Arguments
/// * `config` - Level, file and format settings
/// * `log_dir` - Directory for log files; `None` disables the file layer
pub fn init_logging(config: &LoggingConfig, log_dir: Option<&Path>) -> EtResult<LogGuard> {
    let log_dir = log_dir.filter(|_| config.file_output);
    let (writer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, LOG_FILE_NAME));
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let json_layer = writer.clone().filter(|_| config.json_output).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });
    let text_layer = writer.filter(|_| !config.json_output).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(build_filter(&config.level))
        .with(console_layer)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| EtError::Internal(format!("logging already initialized: {e}")))?;

    match log_dir {
        Some(dir) => tracing::info!(
            "logging initialized at level={}, dir={}, json={}",
            config.level,
            dir.display(),
            config.json_output
        ),
        None => tracing::info!("logging initialized at level={} (console only)", config.level),
    }

    Ok(LogGuard { _file: guard })
}

/// Keeps the non-blocking file writer alive.
/// Drop this to flush and close the log file.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize a console-only logger. Later calls are no-ops.
pub fn init_console_logging(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(build_filter(level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .try_init();
}
