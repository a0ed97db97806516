use crate::net::config::TransportConfig;

pub const DEFAULT_INBOX_CAPACITY: usize = 64;

/// Settings for one interactive program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionConfig {
    /// Buffered events per program. Hub deliveries wait when it's full.
    pub inbox_capacity: usize,
    pub transport: TransportConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            transport: TransportConfig::default(),
        }
    }
}
