//! Game data model shared by the transport, the session state machine and
//! the board renderer.
//!
//! Scoring lives in the external game-logic process; this crate only carries
//! the snapshots it pushes.

pub mod entities;

pub use entities::{GameData, Player, Username, WAITING_FOR_PLAYERS};
