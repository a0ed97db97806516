use std::fmt;

use super::{
    super::game::entities::GameData,
    errors::DecodeError,
    utils::{decode_frame, extract_frame},
};

/// A player decision sent to the game-logic process as a single byte.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Decision {
    /// Keep going: start the game or roll again.
    Roll,
}

impl Decision {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Roll => b"1",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Roll => "roll",
        };
        write!(f, "{repr}")
    }
}

/// One unit of application data: the bytes of a single read up to the
/// first zero byte.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Frame(Vec<u8>);

impl Frame {
    /// Cuts a frame out of the bytes returned by one read.
    pub fn from_read(buf: &[u8]) -> Self {
        Self(extract_frame(buf).to_vec())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn decode(&self) -> Result<GameData, DecodeError> {
        decode_frame(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_is_ascii_one() {
        assert_eq!(Decision::Roll.as_bytes(), &[b'1']);
        assert_eq!(Decision::Roll.to_string(), "roll");
    }

    #[test]
    fn frame_from_padded_read() {
        let mut buf = br#"{"turn":"A"}"#.to_vec();
        buf.extend([0; 16]);
        let frame = Frame::from_read(&buf);
        assert_eq!(frame.len(), 12);
        assert_eq!(frame.decode().unwrap().turn, "A");
    }

    #[test]
    fn frame_of_padding_is_empty() {
        let frame = Frame::from_read(&[0; 8]);
        assert!(frame.is_empty());
        assert!(frame.decode().is_err());
    }
}
