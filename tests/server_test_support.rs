//! Test utilities for server integration tests.
//!
//! Starts a server on an ephemeral port and speaks the wire protocol over
//! raw `TcpStream`s.

#![allow(dead_code)]

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use pgfront::config::ServerConfig;
use pgfront::protocol::{BackendMessage, TransactionStatus};
use pgfront::server::Server;

/// Server parameters every client is expected to receive, in order.
pub const EXPECTED_PARAMETERS: [(&str, &str); 5] = [
    ("server_version", "15.0"),
    ("client_encoding", "UTF8"),
    ("server_encoding", "UTF8"),
    ("is_superuser", "false"),
    ("session_authorization", "postgres"),
];

/// A test server wrapper that handles setup and teardown.
///
/// The server is started when created and automatically aborted when dropped.
pub struct TestServer {
    port: u16,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Starts a new test server on an available port.
    pub async fn start() -> Self {
        let server = Server::bind(&ServerConfig::new("127.0.0.1", 0))
            .await
            .unwrap();
        let port = server.local_addr().unwrap().port();
        let handle = tokio::spawn(server.serve());

        Self { port, handle }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Connects to the test server using a `TcpStream`.
    pub async fn connect(&self) -> TcpStream {
        TcpStream::connect(("127.0.0.1", self.port)).await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Builds a protocol 3.0 startup packet from name/value pairs.
pub fn startup_packet(params: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in params {
        body.extend_from_slice(name.as_bytes());
        body.push(0);
        body.extend_from_slice(value.as_bytes());
        body.push(0);
    }
    body.push(0); // terminator

    let mut buf = Vec::new();
    buf.put_i32((8 + body.len()) as i32);
    buf.put_i32(3 << 16);
    buf.extend_from_slice(&body);
    buf
}

/// Builds a tagged frontend message.
pub fn frontend_message(tag: u8, body: &[u8]) -> Vec<u8> {
    let mut buf = vec![tag];
    buf.put_i32((4 + body.len()) as i32);
    buf.extend_from_slice(body);
    buf
}

/// Reads exactly one backend message.
pub async fn read_message(stream: &mut TcpStream) -> BackendMessage {
    let tag = stream.read_u8().await.unwrap();
    let len = stream.read_i32().await.unwrap();
    let mut body = vec![0u8; len as usize - 4];
    stream.read_exact(&mut body).await.unwrap();

    let mut buf = BytesMut::new();
    buf.put_u8(tag);
    buf.put_i32(len);
    buf.extend_from_slice(&body);
    BackendMessage::decode(&mut buf).unwrap().unwrap()
}

pub fn ready() -> BackendMessage {
    BackendMessage::ReadyForQuery {
        status: TransactionStatus::Idle,
    }
}

/// Sends a startup packet and reads the whole handshake reply.
///
/// Asserts the fixed message order and returns the backend key pair.
pub async fn handshake(stream: &mut TcpStream, params: &[(&str, &str)]) -> (i32, i32) {
    stream.write_all(&startup_packet(params)).await.unwrap();

    assert_eq!(
        read_message(stream).await,
        BackendMessage::AuthenticationOk
    );
    for (name, value) in EXPECTED_PARAMETERS {
        assert_eq!(
            read_message(stream).await,
            BackendMessage::ParameterStatus {
                name: name.to_string(),
                value: value.to_string(),
            }
        );
    }
    let keys = match read_message(stream).await {
        BackendMessage::BackendKeyData {
            process_id,
            secret_key,
        } => (process_id, secret_key),
        other => panic!("expected BackendKeyData, got {other:?}"),
    };
    assert_eq!(read_message(stream).await, ready());
    keys
}

/// Sends one message and asserts the `SET` acknowledgement.
pub async fn query(stream: &mut TcpStream, sql: &str) {
    let mut body = sql.as_bytes().to_vec();
    body.push(0);
    stream
        .write_all(&frontend_message(b'Q', &body))
        .await
        .unwrap();

    assert_eq!(
        read_message(stream).await,
        BackendMessage::CommandComplete {
            tag: "SET".to_string()
        }
    );
    assert_eq!(read_message(stream).await, ready());
}
