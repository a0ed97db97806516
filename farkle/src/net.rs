//! Networking layer between an interactive program and the game-logic
//! process.
//!
//! The game-logic process pushes JSON snapshots written into fixed-size,
//! null-padded buffers and reads single-byte decisions back. This module
//! owns that framing and the per-program TCP session that speaks it.

/// Transport configuration.
pub mod config;

/// Transport error types.
pub mod errors;

/// Frames and decision codes.
pub mod messages;

/// Connection to the game-logic process with its read loop.
pub mod transport;

/// Zero-byte framing helpers.
pub mod utils;
