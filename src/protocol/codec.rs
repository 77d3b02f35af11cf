use bytes::{BufMut, BytesMut};

use crate::protocol::ProtocolError;

/// Maximum message size in bytes (16 MB).
/// PostgreSQL uses up to 1 GB, but 16 MB is a reasonable default for most use cases.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Maximum startup packet size, matching PostgreSQL's `MAX_STARTUP_PACKET_LENGTH`.
pub const MAX_STARTUP_PACKET_LENGTH: usize = 10_000;

/// Read a null-terminated string from a BytesMut buffer.
/// Returns the string (without the null terminator) and consumes it, including the terminator.
pub fn get_cstring(src: &mut BytesMut) -> Result<String, ProtocolError> {
    let Some(null_pos) = src.iter().position(|&b| b == 0) else {
        return Err(ProtocolError::Framing("unterminated string"));
    };

    let bytes = src.split_to(null_pos + 1);
    let s = std::str::from_utf8(&bytes[..null_pos])?;
    Ok(s.to_owned())
}

/// Write a null-terminated string to a BytesMut buffer.
pub fn put_cstring(dst: &mut BytesMut, s: &str) {
    dst.put_slice(s.as_bytes());
    dst.put_u8(0);
}

/// Reads the big-endian length field at `at` without consuming it.
/// Callers must have checked that `src` holds at least `at + 4` bytes.
pub(crate) fn peek_length(src: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([src[at], src[at + 1], src[at + 2], src[at + 3]])
}

/// Builds the error for a stream that ended inside a frame whose length
/// field sits at offset `at`.
pub(crate) fn incomplete_frame(src: &[u8], at: usize) -> ProtocolError {
    let header = at + 4;
    let expected = if src.len() >= header {
        at + peek_length(src, at).max(4) as usize
    } else {
        header
    };
    ProtocolError::IncompleteMessage {
        expected,
        received: src.len(),
    }
}

/// Codec for the query phase of the PostgreSQL protocol.
/// Encodes BackendMessage (in backend.rs) and decodes FrontendMessage (in frontend.rs).
#[derive(Debug)]
pub struct PostgresCodec {
    pub(crate) max_message_size: usize,
}

impl PostgresCodec {
    /// Creates a new PostgresCodec with the default maximum message size.
    pub fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl Default for PostgresCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Codec for the startup phase of the PostgreSQL protocol.
/// Decodes StartupMessage and encodes the handshake's BackendMessages.
#[derive(Debug)]
pub struct StartupCodec {
    pub(crate) max_startup_size: usize,
    pub(crate) max_message_size: usize,
}

impl StartupCodec {
    /// Creates a new StartupCodec with the default size limits.
    pub fn new() -> Self {
        Self {
            max_startup_size: MAX_STARTUP_PACKET_LENGTH,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Transitions to query phase codec after successful startup.
    pub fn ready(self) -> PostgresCodec {
        PostgresCodec {
            max_message_size: self.max_message_size,
        }
    }
}

impl Default for StartupCodec {
    fn default() -> Self {
        Self::new()
    }
}
