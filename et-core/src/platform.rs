//! Platform detection and per-user directory resolution.

use std::path::PathBuf;

use crate::constants::APP_NAME;
use crate::error::{EtError, EtResult};

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    /// Detect the current platform at compile time.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Per-user data directory (logs live underneath it).
    ///
    /// - Windows: `%APPDATA%/EusoTrip`
    /// - macOS: `~/Library/Application Support/EusoTrip`
    /// - Linux: `~/.local/share/EusoTrip`
    pub fn data_dir() -> EtResult<PathBuf> {
        let base = dirs::data_dir()
            .ok_or_else(|| EtError::Config("could not determine data directory".into()))?;
        Ok(base.join(APP_NAME))
    }

    /// Per-user configuration directory.
    ///
    /// - Windows: `%APPDATA%/EusoTrip`
    /// - macOS: `~/Library/Application Support/EusoTrip`
    /// - Linux: `~/.config/EusoTrip`
    pub fn config_dir() -> EtResult<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| EtError::Config("could not determine config directory".into()))?;
        Ok(base.join(APP_NAME))
    }

    /// Default directory for rotated log files.
    pub fn log_dir() -> EtResult<PathBuf> {
        Ok(Self::data_dir()?.join("logs"))
    }

    /// Get a human-readable platform name.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
