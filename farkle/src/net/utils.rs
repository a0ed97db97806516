use serde::Serialize;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{
    super::game::entities::GameData,
    errors::{DecodeError, EncodeError},
};

/// Size of the fixed buffer the game-logic process writes each frame into,
/// and the most the read loop takes from the socket in one read.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Returns the frame contained in a single read: everything before the
/// first zero byte, or the whole read if there's no zero byte.
///
/// Frames are never reassembled across reads, so a message the kernel split
/// in two comes out as two frames that both fail to decode.
pub fn extract_frame(buf: &[u8]) -> &[u8] {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    &buf[..end]
}

pub fn decode_frame(frame: &[u8]) -> Result<GameData, DecodeError> {
    let text = std::str::from_utf8(frame).map_err(|e| DecodeError::Utf8(e.to_string()))?;
    serde_json::from_str(text).map_err(|e| DecodeError::Json(e.to_string()))
}

/// Encodes a value as JSON and null-pads it to [`READ_BUFFER_SIZE`], the
/// way the game-logic process writes its frames.
pub fn encode_padded<T: Serialize>(value: &T) -> Result<Vec<u8>, EncodeError> {
    let mut buf = serde_json::to_vec(value).map_err(|e| EncodeError::Json(e.to_string()))?;
    if buf.len() > READ_BUFFER_SIZE {
        return Err(EncodeError::TooLarge {
            actual: buf.len(),
            max: READ_BUFFER_SIZE,
        });
    }
    buf.resize(READ_BUFFER_SIZE, 0);
    Ok(buf)
}

pub async fn write_padded<T: Serialize, W: AsyncWrite + Unpin>(
    writer: &mut W,
    value: &T,
) -> io::Result<()> {
    let buf = encode_padded(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    // One chunk per frame so the reader sees the whole buffer in one read
    // whenever the socket allows it.
    writer.write_all(&buf).await?;
    writer.flush().await
}
