use std::str::Utf8Error;

/// Protocol parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The fixed part of a frame is missing or has the wrong size.
    #[error("malformed frame: {0}")]
    Framing(&'static str),
    #[error("invalid message length: {0}")]
    InvalidLength(i32),
    #[error("message of {len} bytes exceeds limit of {max} bytes")]
    MessageTooLarge { len: usize, max: usize },
    /// The peer closed the stream before a declared frame was complete.
    #[error("stream closed after {received} of {expected} bytes")]
    IncompleteMessage { expected: usize, received: usize },
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] Utf8Error),
    #[error("unknown message type: 0x{0:02x}")]
    UnknownMessageType(u8),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
