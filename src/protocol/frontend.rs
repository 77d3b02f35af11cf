use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::protocol::codec::{PostgresCodec, StartupCodec, incomplete_frame, peek_length};
use crate::protocol::error::ProtocolError;

/// SSLRequest magic number
const SSL_REQUEST_CODE: i32 = (1234 << 16) | 5679; // 80877103

/// GSSENCRequest magic number
const GSSENC_REQUEST_CODE: i32 = (1234 << 16) | 5680; // 80877104

/// CancelRequest magic number
const CANCEL_REQUEST_CODE: i32 = (1234 << 16) | 5678; // 80877102

/// Length of the fixed startup header: length + version code.
const STARTUP_HEADER_LEN: usize = 8;

/// Messages sent by the frontend (client) during startup phase.
#[derive(Debug, PartialEq, Eq)]
pub enum StartupMessage {
    /// SSLRequest - client wants to negotiate SSL
    SslRequest,
    /// GSSENCRequest - client wants GSSAPI encryption
    GssEncRequest,
    /// CancelRequest - client wants to cancel a query
    CancelRequest { process_id: i32, secret_key: i32 },
    /// StartupMessage - normal connection startup
    Startup {
        protocol_version: i32,
        parameters: StartupParameters,
    },
}

impl StartupMessage {
    /// Decodes a startup packet from the bytes read off the connection.
    ///
    /// Bytes `[0..4]` are the total length, `[4..8]` the version code and the
    /// rest is the parameter block. Fails with `Framing` when the fixed header
    /// is not present.
    pub fn decode(src: &[u8]) -> Result<Self, ProtocolError> {
        if src.len() < STARTUP_HEADER_LEN {
            return Err(ProtocolError::Framing("startup header needs 8 bytes"));
        }

        let code = peek_length(src, 4);
        let mut body = &src[STARTUP_HEADER_LEN..];

        match code {
            SSL_REQUEST_CODE => Ok(StartupMessage::SslRequest),
            GSSENC_REQUEST_CODE => Ok(StartupMessage::GssEncRequest),
            CANCEL_REQUEST_CODE => {
                if body.len() < 8 {
                    return Err(ProtocolError::Framing("cancel request needs 8 bytes of keys"));
                }
                Ok(StartupMessage::CancelRequest {
                    process_id: body.get_i32(),
                    secret_key: body.get_i32(),
                })
            }
            version => Ok(StartupMessage::Startup {
                protocol_version: version,
                parameters: StartupParameters::decode(body)?,
            }),
        }
    }
}

/// Startup parameters from the client, in the order they were sent.
///
/// The set is client-chosen and open-ended, so it is kept as plain
/// name/value pairs rather than typed fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupParameters {
    pairs: Vec<(String, String)>,
}

impl StartupParameters {
    /// Decodes the parameter block of a startup packet.
    ///
    /// The block is a run of null-terminated strings read pairwise as
    /// (name, value). Empty strings pair like any other, so the protocol's
    /// closing `\0` ends up as an odd trailing string and is dropped. Bytes
    /// after the last null are ignored.
    pub fn decode(mut block: &[u8]) -> Result<Self, ProtocolError> {
        let mut strings = Vec::new();

        while let Some(end) = block.iter().position(|&b| b == 0) {
            let s = std::str::from_utf8(&block[..end])?;
            block = &block[end + 1..];
            strings.push(s.to_owned());
        }

        let mut strings = strings.into_iter();
        let mut pairs = Vec::with_capacity(strings.len() / 2);
        while let (Some(name), Some(value)) = (strings.next(), strings.next()) {
            pairs.push((name, value));
        }

        Ok(Self { pairs })
    }

    /// Returns the value of the first parameter named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StartupParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

impl Decoder for StartupCodec {
    type Item = StartupMessage;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Need at least 4 bytes to know the packet length
        if src.len() < 4 {
            return Ok(None);
        }

        // Peek at the length (don't consume yet)
        let len = peek_length(src, 0);
        if len < STARTUP_HEADER_LEN as i32 {
            return Err(ProtocolError::InvalidLength(len));
        }
        let len = len as usize;
        if len > self.max_startup_size {
            return Err(ProtocolError::MessageTooLarge {
                len,
                max: self.max_startup_size,
            });
        }

        // Wait for complete message
        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }

        let msg_buf = src.split_to(len);
        StartupMessage::decode(&msg_buf).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(msg) => Ok(Some(msg)),
            None if src.is_empty() => Ok(None),
            None if src.len() < STARTUP_HEADER_LEN => {
                Err(ProtocolError::Framing("startup header needs 8 bytes"))
            }
            None => Err(incomplete_frame(src, 0)),
        }
    }
}

/// A message sent by the frontend (client) during query phase.
///
/// Only the framing is understood; the payload is carried uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendMessage {
    /// Message type byte, e.g. 'Q' for a simple query.
    pub tag: u8,
    /// Message body, excluding the tag and length field.
    pub payload: Bytes,
}

impl Decoder for PostgresCodec {
    type Item = FrontendMessage;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Need at least 5 bytes (type + length)
        if src.len() < 5 {
            return Ok(None);
        }

        // Peek at the length (bytes 1-4, don't consume yet)
        let len = peek_length(src, 1);
        if len < 4 {
            return Err(ProtocolError::InvalidLength(len));
        }
        let len = len as usize;
        if len > self.max_message_size {
            return Err(ProtocolError::MessageTooLarge {
                len,
                max: self.max_message_size,
            });
        }

        // Total message size = 1 (type byte) + length
        let total = 1 + len;

        // Wait for complete message
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut msg_buf = src.split_to(total);
        let tag = msg_buf.get_u8();
        msg_buf.advance(4);
        Ok(Some(FrontendMessage {
            tag,
            payload: msg_buf.freeze(),
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(msg) => Ok(Some(msg)),
            None if src.is_empty() => Ok(None),
            None => Err(incomplete_frame(src, 1)),
        }
    }
}
