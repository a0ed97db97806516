//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use farkle::{SessionConfig, TransportConfig};
use std::{net::SocketAddr, str::FromStr, time::Duration};

pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
    6161,
);
pub const DEFAULT_GAME_ADDR: &str = "localhost:4121";
pub const DEFAULT_MAX_SESSIONS: usize = 16;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address remote terminals connect to
    pub bind: SocketAddr,
    /// Address of the game-logic process every program dials
    pub game_addr: String,
    /// Terminals attached at once; later ones are turned away
    pub max_sessions: usize,
    /// Per-program settings
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND,
            game_addr: DEFAULT_GAME_ADDR.to_string(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `game_addr_override` - Optional game-logic address override (from CLI args)
    /// * `max_sessions_override` - Optional session limit override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        game_addr_override: Option<String>,
        max_sessions_override: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env("SERVER_BIND")?.unwrap_or(defaults.bind),
        };

        let game_addr = game_addr_override
            .or_else(|| std::env::var("GAME_ADDR").ok())
            .unwrap_or(defaults.game_addr);

        let max_sessions = match max_sessions_override {
            Some(max) => max,
            None => parse_env("MAX_SESSIONS")?.unwrap_or(defaults.max_sessions),
        };

        let connect_timeout = parse_env::<u64>("CONNECT_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.session.transport.connect_timeout);

        let session = SessionConfig {
            inbox_capacity: parse_env("SESSION_INBOX_CAPACITY")?
                .unwrap_or(defaults.session.inbox_capacity),
            transport: TransportConfig {
                connect_timeout,
                channel_capacity: parse_env("CHANNEL_CAPACITY")?
                    .unwrap_or(defaults.session.transport.channel_capacity),
            },
        };

        Ok(ServerConfig {
            bind,
            game_addr,
            max_sessions,
            session,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game_addr.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                var: "GAME_ADDR".to_string(),
                hint: "Point it at the game-logic process, e.g. localhost:4121".to_string(),
            });
        }

        if self.max_sessions == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_SESSIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.session.inbox_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "SESSION_INBOX_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.session.transport.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "CHANNEL_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.session.transport.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "CONNECT_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parses an environment variable. Unset is `None`; set but unparsable is
/// an error.
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("{value:?}: {e}"),
            }),
        Err(_) => Ok(None),
    }
}
