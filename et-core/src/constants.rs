//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "EusoTrip";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name prefix for rotated log files.
pub const LOG_FILE_NAME: &str = "eusotrip-realtime.log";

/// Default realtime endpoint for local development.
pub const DEFAULT_SOCKET_URL: &str = "ws://localhost:3001/ws";

/// Base delay before the first reconnection attempt, in milliseconds.
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 3_000;

/// Multiplier applied to the reconnect delay for every further attempt.
pub const RECONNECT_BACKOFF_FACTOR: f64 = 1.5;

/// Reconnection attempts before the client gives up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Interval between keep-alive pings, in milliseconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Time allowed for the transport to open, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Error recorded in the connection state once reconnection gives up.
pub const RECONNECT_EXHAUSTED_MESSAGE: &str = "Maximum reconnection attempts reached";

/// Capacity of the command channel between client handles and the supervisor task.
pub const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Role identifiers as sent in the authentication frame.
pub mod roles {
    pub const SHIPPER: &str = "SHIPPER";
    pub const CARRIER: &str = "CARRIER";
    pub const BROKER: &str = "BROKER";
    pub const DRIVER: &str = "DRIVER";
    pub const DISPATCH: &str = "DISPATCH";
    pub const ESCORT: &str = "ESCORT";
    pub const TERMINAL_MANAGER: &str = "TERMINAL_MANAGER";
    pub const COMPLIANCE_OFFICER: &str = "COMPLIANCE_OFFICER";
    pub const SAFETY_MANAGER: &str = "SAFETY_MANAGER";
    pub const ADMIN: &str = "ADMIN";
    pub const SUPER_ADMIN: &str = "SUPER_ADMIN";

    /// All known role identifiers.
    pub const ALL: &[&str] = &[
        SHIPPER,
        CARRIER,
        BROKER,
        DRIVER,
        DISPATCH,
        ESCORT,
        TERMINAL_MANAGER,
        COMPLIANCE_OFFICER,
        SAFETY_MANAGER,
        ADMIN,
        SUPER_ADMIN,
    ];
}
