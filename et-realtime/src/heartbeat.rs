//! Keep-alive pings and optional liveness tracking.

use std::time::Duration;

use et_core::constants;

/// Heartbeat configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatConfig {
    /// Interval between pings.
    pub interval: Duration,
    /// Unanswered pings before the connection is treated as dead (0 = never).
    pub max_missed: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(constants::DEFAULT_HEARTBEAT_INTERVAL_MS),
            max_missed: 0,
        }
    }
}

/// Outcome of one heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    /// Send a ping.
    Ping,
    /// Too many pings went unanswered.
    Stale(u32),
}

/// Counts pings sent since the last inbound frame.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    config: HeartbeatConfig,
    outstanding: u32,
}

impl HeartbeatMonitor {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            outstanding: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Called when the heartbeat timer fires.
    pub fn tick(&mut self) -> Beat {
        if self.config.max_missed > 0 && self.outstanding >= self.config.max_missed {
            return Beat::Stale(self.outstanding);
        }
        self.outstanding += 1;
        Beat::Ping
    }

    /// Any inbound traffic (a pong included) proves the peer is alive.
    pub fn on_inbound(&mut self) {
        self.outstanding = 0;
    }

    pub fn outstanding(&self) -> u32 {
        self.outstanding
    }
}
