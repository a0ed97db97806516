//! Terminal-session server for Farkle.
//!
//! Remote terminals connect over plain TCP. Each one gets its own
//! interactive program talking to the game-logic process, and a shared
//! session hub lets the server announce who joined and who left.

pub mod config;
pub mod logging;
pub mod server;
pub mod terminal;

pub use config::{ConfigError, ServerConfig};
pub use server::Server;
