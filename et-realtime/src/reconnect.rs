//! Reconnection backoff policy.

use std::time::Duration;

use et_core::constants;

/// Socket reconnection behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first attempt; later attempts grow by 1.5x each.
    pub base_interval: Duration,
    /// Attempts before giving up.
    pub max_attempts: u32,
    /// Reconnect after an unexpected close.
    pub enabled: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(constants::DEFAULT_RECONNECT_INTERVAL_MS),
            max_attempts: constants::DEFAULT_MAX_RECONNECT_ATTEMPTS,
            enabled: true,
        }
    }
}

impl ReconnectConfig {
    /// Delay before attempt `attempt` (counted from 0): `base * 1.5^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = constants::RECONNECT_BACKOFF_FACTOR.powi(attempt.min(i32::MAX as u32) as i32);
        Duration::try_from_secs_f64(self.base_interval.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Delay before the next attempt, given how many have already been made.
    ///
    /// `None` once `attempts` has reached the cap or reconnection is disabled.
    pub fn next_delay(&self, attempts: u32) -> Option<Duration> {
        if !self.enabled || attempts >= self.max_attempts {
            return None;
        }
        Some(self.delay_for(attempts))
    }
}
