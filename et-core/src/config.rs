//! Application configuration management.
//!
//! Handles loading, saving, and accessing the realtime client configuration:
//! socket endpoint, reconnect and heartbeat tuning, the default identity used
//! by the CLI, and logging preferences. Configuration is persisted as TOML.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{EtError, EtResult};
use crate::platform::Platform;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Realtime connection settings.
    #[serde(default)]
    pub realtime: RealtimeSettings,

    /// Identity used when none is given on the command line.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Realtime connection configuration.
///
/// Durations are stored in milliseconds so the TOML stays readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeSettings {
    /// WebSocket endpoint (e.g., "wss://api.eusotrip.com/ws").
    #[serde(default = "default_url")]
    pub url: String,

    /// Base delay before the first reconnection attempt.
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_ms: u64,

    /// Reconnection attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Interval between keep-alive pings.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,

    /// Reconnect automatically after an unexpected close.
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,

    /// Unanswered pings before the connection is considered dead (0 = never).
    #[serde(default)]
    pub max_missed_heartbeats: u32,

    /// Maximum frames buffered while disconnected (0 = unbounded).
    #[serde(default)]
    pub outbound_queue_limit: usize,

    /// Time allowed for the transport to open.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

/// Default identity for CLI sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// User id sent in the authentication frame.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Role identifier, e.g. "DRIVER" or "BROKER".
    #[serde(default)]
    pub role: Option<String>,

    /// Company id, if the user belongs to one.
    #[serde(default)]
    pub company_id: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses default location.
    #[serde(default)]
    pub directory: String,

    /// Also write a daily-rotated log file under `directory`.
    #[serde(default = "default_true")]
    pub file_output: bool,

    /// Use JSON for the log file.
    #[serde(default)]
    pub json_output: bool,
}

// Default value functions for serde

fn default_url() -> String {
    constants::DEFAULT_SOCKET_URL.to_string()
}

fn default_reconnect_interval() -> u64 {
    constants::DEFAULT_RECONNECT_INTERVAL_MS
}

fn default_max_reconnect_attempts() -> u32 {
    constants::DEFAULT_MAX_RECONNECT_ATTEMPTS
}

fn default_heartbeat_interval() -> u64 {
    constants::DEFAULT_HEARTBEAT_INTERVAL_MS
}

fn default_connect_timeout() -> u64 {
    constants::DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            url: default_url(),
            reconnect_interval_ms: default_reconnect_interval(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            auto_reconnect: true,
            max_missed_heartbeats: 0,
            outbound_queue_limit: 0,
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            file_output: true,
            json_output: false,
        }
    }
}

impl RealtimeSettings {
    /// Check that the settings describe a usable connection.
    pub fn validate(&self) -> EtResult<()> {
        if self.url.trim().is_empty() {
            return Err(EtError::MissingConfig("realtime.url".into()));
        }
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| EtError::Config(format!("invalid realtime.url '{}': {e}", self.url)))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(EtError::Config(format!(
                "realtime.url must use ws:// or wss://, got '{}'",
                parsed.scheme()
            )));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(EtError::Config("realtime.heartbeat_interval_ms must be > 0".into()));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from the default config file path.
    pub fn load_default() -> EtResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> EtResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file path.
    pub fn save_default(&self) -> EtResult<()> {
        let path = Self::default_config_path()?;
        self.save_to_file(&path)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> EtResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| EtError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> EtResult<PathBuf> {
        let config_dir = Platform::config_dir()?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get the effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> EtResult<PathBuf> {
        if self.logging.directory.is_empty() {
            Platform::log_dir()
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }

    /// Sanitize and normalize a realtime endpoint.
    ///
    /// Maps http(s) schemes onto ws(s), adds `ws://` when no scheme is given,
    /// and strips trailing slashes.
    pub fn sanitize_socket_url(address: &str) -> String {
        let trimmed = address.trim().trim_matches('"').trim();
        if trimmed.is_empty() {
            return String::new();
        }

        let with_scheme = if let Some(rest) = trimmed.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = trimmed.strip_prefix("http://") {
            format!("ws://{rest}")
        } else if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
            trimmed.to_string()
        } else {
            format!("ws://{trimmed}")
        };

        with_scheme.trim_end_matches('/').to_string()
    }
}

/// Thread-safe configuration holder for shared access.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<AppConfig>>,
}

impl ConfigHandle {
    /// Create a new configuration handle.
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Read the configuration.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.read().await
    }

    /// Write/update the configuration.
    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, AppConfig> {
        self.inner.write().await
    }

    /// Save the current configuration to the given path.
    pub async fn save_to(&self, path: &Path) -> EtResult<()> {
        let config = self.inner.read().await;
        config.save_to_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.realtime.reconnect_interval_ms, 3_000);
        assert_eq!(config.realtime.max_reconnect_attempts, 10);
        assert_eq!(config.realtime.heartbeat_interval_ms, 30_000);
        assert!(config.realtime.auto_reconnect);
        assert_eq!(config.realtime.outbound_queue_limit, 0);
        assert_eq!(config.logging.level, "info");
        assert!(config.identity.user_id.is_none());
        assert!(config.realtime.validate().is_ok());
    }

    #[test]
    fn test_sanitize_socket_url() {
        assert_eq!(
            AppConfig::sanitize_socket_url("https://api.eusotrip.com/ws/"),
            "wss://api.eusotrip.com/ws"
        );
        assert_eq!(
            AppConfig::sanitize_socket_url("http://192.168.1.100:3001/ws"),
            "ws://192.168.1.100:3001/ws"
        );
        assert_eq!(
            AppConfig::sanitize_socket_url("  \"wss://example.com/\"  "),
            "wss://example.com"
        );
        assert_eq!(
            AppConfig::sanitize_socket_url("localhost:3001"),
            "ws://localhost:3001"
        );
        assert_eq!(AppConfig::sanitize_socket_url("   "), "");
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let mut settings = RealtimeSettings::default();
        settings.url = "https://api.eusotrip.com".into();
        assert!(matches!(settings.validate(), Err(EtError::Config(_))));

        settings.url = String::new();
        assert!(matches!(settings.validate(), Err(EtError::MissingConfig(_))));

        settings.url = "wss://api.eusotrip.com/ws".into();
        settings.heartbeat_interval_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [realtime]
            url = "wss://rt.example.com/ws"
            max_reconnect_attempts = 3

            [identity]
            user_id = "u1"
            role = "DRIVER"
            "#,
        )
        .unwrap();
        assert_eq!(config.realtime.url, "wss://rt.example.com/ws");
        assert_eq!(config.realtime.max_reconnect_attempts, 3);
        assert_eq!(config.realtime.reconnect_interval_ms, 3_000);
        assert_eq!(config.identity.role.as_deref(), Some("DRIVER"));
        assert!(config.identity.company_id.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file_output);
        assert!(!config.logging.json_output);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.realtime.outbound_queue_limit = 500;
        config.identity.company_id = Some("c9".into());
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.realtime.outbound_queue_limit, 500);
        assert_eq!(loaded.identity.company_id.as_deref(), Some("c9"));
    }

    #[tokio::test]
    async fn test_config_handle_write_then_read() {
        let handle = ConfigHandle::new(AppConfig::default());
        handle.write().await.realtime.auto_reconnect = false;
        assert!(!handle.read().await.realtime.auto_reconnect);
    }
}
