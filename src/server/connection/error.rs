use crate::protocol::ProtocolError;

/// Connection error types.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The startup packet could not be read or decoded.
    #[error("handshake failed: {0}")]
    Handshake(#[source] ProtocolError),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
