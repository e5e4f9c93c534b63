#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

const DEFAULT_RECONNECT_INTERVAL_DURATION: Duration = Duration::from_secs(3);
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Configuration for WebSocket client behavior.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to automatically reconnect after an unexpected close
    pub should_reconnect: bool,
    /// Fixed delay before each automatic reconnect attempt.
    ///
    /// The delay is linear, not exponential: every attempt waits the same
    /// interval.
    pub reconnect_interval: Duration,
    /// Maximum number of consecutive automatic reconnect attempts before
    /// giving up. `0` disables automatic reconnection entirely.
    ///
    /// The counter resets on a successful connect or a manual
    /// [`reconnect`](super::ConnectionManager::reconnect).
    pub max_reconnect_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            should_reconnect: true,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL_DURATION,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}
