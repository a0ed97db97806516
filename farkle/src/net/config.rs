//! Transport configuration.

use std::time::Duration;

/// Default time allowed for dialing the game-logic process.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default capacity of each read-loop channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Transport session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Give up dialing after this long
    pub connect_timeout: Duration,

    /// Frames (and errors) buffered before the read loop waits for the
    /// consumer to catch up
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}
