//! EusoTrip Realtime Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by the realtime client and CLI:
//! - Application configuration (socket URL, reconnect and heartbeat tuning, identity)
//! - Global error types covering all error categories
//! - Structured logging with tracing
//! - Platform directory resolution
//! - Common constants

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod constants;

// Re-export commonly used items at the crate root
pub use config::{AppConfig, ConfigHandle, RealtimeSettings};
pub use error::{EtError, EtResult};
pub use logging::init_logging;
pub use platform::Platform;
