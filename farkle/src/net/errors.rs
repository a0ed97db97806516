//! Transport error types.
//!
//! Every failure at the transport boundary is turned into a session event
//! rather than raised to the caller, so these types are `Clone` and carry
//! owned messages.

use std::io;
use thiserror::Error;

/// Failed to dial the game-logic process.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ConnectionError {
    #[error("couldn't connect to {addr}: {message}")]
    Dial { addr: String, message: String },
    #[error("timed out connecting to {addr} after {secs}s")]
    Timeout { addr: String, secs: u64 },
}

/// A failed read inside the read loop.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("read failed: {message}")]
pub struct ReadError {
    pub kind: io::ErrorKind,
    pub message: String,
}

impl ReadError {
    /// Whether the error means the connection can't deliver anything else.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::NotConnected
                | io::ErrorKind::UnexpectedEof
        )
    }
}

impl From<io::Error> for ReadError {
    fn from(error: io::Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Failed to submit a decision.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum WriteError {
    #[error("not connected")]
    NotConnected,
    #[error("write failed: {0}")]
    Io(String),
}

impl From<io::Error> for WriteError {
    fn from(error: io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

/// A frame that isn't a valid game snapshot. Usually a message that was
/// split across two reads and so arrived truncated.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DecodeError {
    #[error("frame isn't valid UTF-8: {0}")]
    Utf8(String),
    #[error("frame isn't a valid game snapshot: {0}")]
    Json(String),
}

/// A snapshot that can't be written as a single padded frame.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum EncodeError {
    #[error("frame size {actual} exceeds maximum {max}")]
    TooLarge { actual: usize, max: usize },
    #[error("failed to encode game snapshot: {0}")]
    Json(String),
}

/// Misuse of a transport session.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,
    #[error("read loop already started")]
    AlreadyReading,
}
