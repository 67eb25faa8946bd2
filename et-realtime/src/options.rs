//! Client construction options.

use std::time::Duration;

use et_core::config::RealtimeSettings;
use et_core::constants;
use et_core::error::EtResult;

use crate::heartbeat::HeartbeatConfig;
use crate::reconnect::ReconnectConfig;

/// Everything the client needs besides a connector.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// WebSocket endpoint.
    pub url: String,
    pub reconnect: ReconnectConfig,
    pub heartbeat: HeartbeatConfig,
    /// Time allowed for the transport to open.
    pub connect_timeout: Duration,
    /// Maximum frames buffered while disconnected (0 = unbounded).
    pub outbound_queue_limit: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new(constants::DEFAULT_SOCKET_URL)
    }
}

impl ClientOptions {
    /// Options with default tuning for the given endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            connect_timeout: Duration::from_millis(constants::DEFAULT_CONNECT_TIMEOUT_MS),
            outbound_queue_limit: 0,
        }
    }

    /// Build options from the `[realtime]` configuration section.
    pub fn from_settings(settings: &RealtimeSettings) -> EtResult<Self> {
        settings.validate()?;
        Ok(Self {
            url: settings.url.clone(),
            reconnect: ReconnectConfig {
                base_interval: Duration::from_millis(settings.reconnect_interval_ms),
                max_attempts: settings.max_reconnect_attempts,
                enabled: settings.auto_reconnect,
            },
            heartbeat: HeartbeatConfig {
                interval: Duration::from_millis(settings.heartbeat_interval_ms),
                max_missed: settings.max_missed_heartbeats,
            },
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            outbound_queue_limit: settings.outbound_queue_limit,
        })
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_queue_limit(mut self, limit: usize) -> Self {
        self.outbound_queue_limit = limit;
        self
    }
}
