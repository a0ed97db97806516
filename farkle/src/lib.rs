//! # Farkle
//!
//! Session plumbing for a multiplayer Farkle game played from terminals.
//!
//! The game rules live in a separate game-logic process. This library is
//! everything between that process and a player's screen: the TCP
//! transport with its null-padded JSON frames, the client state machine
//! that reacts to frames and key presses, the driver that runs one state
//! machine per player, and the hub that lets a server broadcast to every
//! attached player.
//!
//! ## Core Modules
//!
//! - [`game`]: Game snapshot and player entities
//! - [`net`]: Transport session, framing and wire errors
//! - [`session`]: Client state machine and its driver
//! - [`hub`]: Registry of attached programs and broadcast
//! - [`view`]: Plain-text board renderer
//!
//! ## Example
//!
//! ```
//! use farkle::{ClientState, SessionEvent, UiState, UserInput};
//!
//! let (state, _commands) = ClientState::new().apply(SessionEvent::Input(UserInput::Connect));
//! assert_eq!(state.ui, UiState::Connecting);
//! ```

/// Game snapshot and player entities.
pub mod game;
pub use game::{GameData, Player, Username, WAITING_FOR_PLAYERS};

/// Transport to the game-logic process.
pub mod net;
pub use net::{
    config::TransportConfig,
    messages::{Decision, Frame},
    transport::{GameClient, ReadChannels, TransportSession},
};

/// Per-player interactive program.
pub mod session;
pub use session::{
    ClientState, Command, SessionConfig, SessionDriver, SessionEvent, SessionHandle, UiState,
    UserInput,
};

/// Session hub.
pub mod hub;
pub use hub::{HubEvent, HubHandle, SessionHub, SessionId};

pub mod view;
