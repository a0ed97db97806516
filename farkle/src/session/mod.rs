//! Per-user interactive program.
//!
//! A program is a [`ClientState`] plus the [`SessionDriver`] that feeds it
//! events and carries out the commands it returns. Terminals and UIs talk
//! to a running program through its [`SessionHandle`].

pub mod config;
pub mod driver;
pub mod errors;
pub mod messages;
pub mod state_machine;

pub use config::SessionConfig;
pub use driver::{SessionDriver, SessionHandle};
pub use errors::SessionError;
pub use messages::{Command, SessionEvent, UserInput};
pub use state_machine::{ClientState, UiState};
