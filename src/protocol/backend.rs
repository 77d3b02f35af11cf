use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::ProtocolError;
use crate::protocol::codec::{PostgresCodec, StartupCodec, get_cstring, peek_length, put_cstring};

/// Messages sent by the backend (server) to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMessage {
    /// 'R' - Authentication response (AuthenticationOk)
    AuthenticationOk,
    /// 'K' - Backend key data for cancel requests
    BackendKeyData { process_id: i32, secret_key: i32 },
    /// 'S' - Parameter status notification
    ParameterStatus { name: String, value: String },
    /// 'Z' - Ready for query
    ReadyForQuery { status: TransactionStatus },
    /// 'C' - Command complete
    CommandComplete { tag: String },
}

impl BackendMessage {
    /// Returns the message type byte.
    pub fn tag(&self) -> u8 {
        match self {
            BackendMessage::AuthenticationOk => b'R',
            BackendMessage::BackendKeyData { .. } => b'K',
            BackendMessage::ParameterStatus { .. } => b'S',
            BackendMessage::ReadyForQuery { .. } => b'Z',
            BackendMessage::CommandComplete { .. } => b'C',
        }
    }

    /// Appends the wire form of this message to `dst`.
    ///
    /// The length field counts itself and the payload, never the tag byte.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(self.tag());
        let len_pos = dst.len();
        dst.put_i32(0); // patched below

        match self {
            BackendMessage::AuthenticationOk => {
                dst.put_i32(0); // auth type 0 = Ok
            }
            BackendMessage::BackendKeyData {
                process_id,
                secret_key,
            } => {
                dst.put_i32(*process_id);
                dst.put_i32(*secret_key);
            }
            BackendMessage::ParameterStatus { name, value } => {
                put_cstring(dst, name);
                put_cstring(dst, value);
            }
            BackendMessage::ReadyForQuery { status } => {
                dst.put_u8(status.as_byte());
            }
            BackendMessage::CommandComplete { tag } => {
                put_cstring(dst, tag);
            }
        }

        let len = (dst.len() - len_pos) as i32;
        dst[len_pos..len_pos + 4].copy_from_slice(&len.to_be_bytes());
    }

    /// Decodes one backend message, as a client would.
    ///
    /// Returns `Ok(None)` and leaves `src` untouched until a whole message is buffered.
    pub fn decode(src: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if src.len() < 5 {
            return Ok(None);
        }

        let len = peek_length(src, 1);
        if len < 4 {
            return Err(ProtocolError::InvalidLength(len));
        }
        let total = 1 + len as usize;
        if src.len() < total {
            return Ok(None);
        }

        let mut body = src.split_to(total);
        let tag = body.get_u8();
        body.advance(4);

        let msg = match tag {
            b'R' => {
                if body.len() != 4 {
                    return Err(ProtocolError::Framing("authentication body must be 4 bytes"));
                }
                match body.get_i32() {
                    0 => BackendMessage::AuthenticationOk,
                    _ => return Err(ProtocolError::Framing("unsupported authentication type")),
                }
            }
            b'K' => {
                if body.len() != 8 {
                    return Err(ProtocolError::Framing("backend key data must be 8 bytes"));
                }
                BackendMessage::BackendKeyData {
                    process_id: body.get_i32(),
                    secret_key: body.get_i32(),
                }
            }
            b'S' => {
                let name = get_cstring(&mut body)?;
                let value = get_cstring(&mut body)?;
                BackendMessage::ParameterStatus { name, value }
            }
            b'Z' => {
                if body.len() != 1 {
                    return Err(ProtocolError::Framing("ready for query must be 1 byte"));
                }
                let status = TransactionStatus::from_byte(body.get_u8())
                    .ok_or(ProtocolError::Framing("unknown transaction status"))?;
                BackendMessage::ReadyForQuery { status }
            }
            b'C' => BackendMessage::CommandComplete {
                tag: get_cstring(&mut body)?,
            },
            other => return Err(ProtocolError::UnknownMessageType(other)),
        };
        Ok(Some(msg))
    }
}

impl Encoder<BackendMessage> for PostgresCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: BackendMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        Ok(())
    }
}

impl Encoder<BackendMessage> for StartupCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: BackendMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        Ok(())
    }
}

/// Transaction status indicator for ReadyForQuery message.
///
/// No transactions exist here, so the server is always idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// 'I' - Idle (not in a transaction block)
    Idle,
}

impl TransactionStatus {
    fn as_byte(self) -> u8 {
        match self {
            TransactionStatus::Idle => b'I',
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'I' => Some(TransactionStatus::Idle),
            _ => None,
        }
    }
}
