//! Global error types for the EusoTrip realtime client.
//!
//! All error categories across the workspace are unified into a single
//! `EtError` enum with conversions from underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using EtError.
pub type EtResult<T> = Result<T, EtError>;

/// Unified error type covering all error categories.
#[derive(Error, Debug)]
pub enum EtError {
    // -- Configuration errors --
    /// Failed to load, parse, or validate configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- Transport errors --
    /// WebSocket connection or write failure.
    #[error("socket error: {0}")]
    Socket(String),

    /// The socket was closed by the caller while an operation was pending.
    #[error("socket disconnected")]
    SocketDisconnected,

    /// An operation did not complete in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The server rejected the authentication frame.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Automatic reconnection gave up after the configured number of attempts.
    #[error("maximum reconnection attempts reached ({attempts})")]
    ReconnectExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    // -- Data errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EtError {
    /// Whether the error came from the transport and may clear up on reconnect.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Socket(_) | Self::Timeout(_) | Self::Io(_))
    }
}

impl From<serde_json::Error> for EtError {
    fn from(e: serde_json::Error) -> Self {
        EtError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for EtError {
    fn from(e: toml::de::Error) -> Self {
        EtError::Config(e.to_string())
    }
}
