//! Events consumed and commands produced by the client state machine.

use std::fmt;

use crate::{
    hub::messages::HubEvent,
    net::{errors::ReadError, messages::Decision},
};

/// Something the user asked for, independent of how it was typed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum UserInput {
    /// Dial the game-logic process.
    Connect,
    /// Send the roll decision.
    Roll,
    /// Leave the game.
    Quit,
}

impl UserInput {
    /// Maps a key press to an input. Unbound keys map to `None`.
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            'c' | 'C' => Some(Self::Connect),
            '1' => Some(Self::Roll),
            // Ctrl-C arrives as ETX on a raw terminal.
            'q' | 'Q' | '\u{3}' => Some(Self::Quit),
            _ => None,
        }
    }
}

impl fmt::Display for UserInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Connect => "connect",
            Self::Roll => "roll",
            Self::Quit => "quit",
        };
        write!(f, "{repr}")
    }
}

/// An event delivered to an interactive program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionEvent {
    /// Key press from the attached terminal.
    Input(UserInput),
    ConnectionSuccess,
    ConnectionFailed { reason: String },
    /// Bytes of one frame from the read loop.
    FrameReceived(Vec<u8>),
    ReadError(ReadError),
    /// The read loop ended and both of its channels closed.
    ChannelsClosed,
    ResponseSucceeded,
    ResponseFailed { reason: String },
    /// Out-of-band notification from the session hub.
    Hub(HubEvent),
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(input) => write!(f, "input {input}"),
            Self::ConnectionSuccess => write!(f, "connection success"),
            Self::ConnectionFailed { reason } => write!(f, "connection failed: {reason}"),
            Self::FrameReceived(bytes) => write!(f, "frame of {} bytes", bytes.len()),
            Self::ReadError(error) => write!(f, "{error}"),
            Self::ChannelsClosed => write!(f, "channels closed"),
            Self::ResponseSucceeded => write!(f, "response succeeded"),
            Self::ResponseFailed { reason } => write!(f, "response failed: {reason}"),
            Self::Hub(event) => write!(f, "hub: {event}"),
        }
    }
}

/// Work the state machine asks its driver to carry out.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    /// Dial the game-logic process in the background.
    Connect,
    /// Start the transport's read loop.
    StartReading,
    /// Wait for the next frame or read error.
    AwaitChannels,
    /// Write a decision in the background.
    Respond(Decision),
    /// Close the transport.
    Close,
    /// Stop the program.
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_bindings() {
        assert_eq!(UserInput::from_key('c'), Some(UserInput::Connect));
        assert_eq!(UserInput::from_key('C'), Some(UserInput::Connect));
        assert_eq!(UserInput::from_key('1'), Some(UserInput::Roll));
        assert_eq!(UserInput::from_key('q'), Some(UserInput::Quit));
        assert_eq!(UserInput::from_key('2'), None);
        assert_eq!(UserInput::from_key('\r'), None);
    }

    #[test]
    fn event_display() {
        assert_eq!(
            SessionEvent::FrameReceived(vec![b'{', b'}']).to_string(),
            "frame of 2 bytes"
        );
        assert_eq!(
            SessionEvent::Input(UserInput::Roll).to_string(),
            "input roll"
        );
    }
}
