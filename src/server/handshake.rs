use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Framed;
use tracing::{debug, info};

use crate::protocol::{
    BackendMessage, PostgresCodec, ProtocolError, StartupCodec, StartupMessage, TransactionStatus,
};
use crate::server::connection::ConnectionError;
use crate::session::Session;

/// Server parameters reported to every client after authentication.
/// These are fixed and not derived from the client's startup parameters.
pub const SERVER_PARAMETERS: [(&str, &str); 5] = [
    ("server_version", "15.0"),
    ("client_encoding", "UTF8"),
    ("server_encoding", "UTF8"),
    ("is_superuser", "false"),
    ("session_authorization", "postgres"),
];

#[derive(Debug)]
pub enum HandshakeResult<S> {
    /// Handshake completed successfully, transitioning to query phase.
    Success {
        framed: Framed<S, PostgresCodec>,
        session: Session,
    },
    /// Handshake was a CancelRequest.
    CancelRequested { pid: i32, secret_key: i32 },
}

#[derive(Debug)]
enum HandshakeState {
    /// Waiting for the startup packet.
    AwaitStartup,
    Authenticating(Session),
    /// Reporting server parameters, backend key and readiness.
    Initializing(Session),
    Ready(Session),
}

impl HandshakeState {
    fn name(&self) -> &'static str {
        match self {
            HandshakeState::AwaitStartup => "await_startup",
            HandshakeState::Authenticating(_) => "authenticating",
            HandshakeState::Initializing(_) => "initializing",
            HandshakeState::Ready(_) => "ready",
        }
    }
}

/// A single client handshake implementation.
///
/// Runs startup, authentication and session initialization in that order.
/// Authentication always succeeds with `AuthenticationOk`; there is no
/// credential check. A failed read leaves the client without any response.
pub struct Handshake<S> {
    framed: Framed<S, StartupCodec>,
    pid: i32,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Handshake<S> {
    pub fn new(socket: S, pid: i32) -> Self {
        Self {
            framed: Framed::new(socket, StartupCodec::new()),
            pid,
        }
    }

    pub async fn run(mut self) -> Result<HandshakeResult<S>, ConnectionError> {
        let mut state = HandshakeState::AwaitStartup;

        loop {
            debug!(pid = self.pid, state = state.name(), "handshake");

            state = match state {
                HandshakeState::AwaitStartup => match self.read_startup().await? {
                    StartupMessage::SslRequest | StartupMessage::GssEncRequest => {
                        self.refuse_encryption().await?;
                        HandshakeState::AwaitStartup
                    }
                    StartupMessage::CancelRequest {
                        process_id,
                        secret_key,
                    } => {
                        return Ok(HandshakeResult::CancelRequested {
                            pid: process_id,
                            secret_key,
                        });
                    }
                    StartupMessage::Startup {
                        protocol_version,
                        parameters,
                    } => {
                        let session = Session::new(parameters, self.pid, rand::random::<i32>());
                        let protocol =
                            format!("{}.{}", protocol_version >> 16, protocol_version & 0xffff);
                        info!(
                            pid = self.pid,
                            user = session.user().unwrap_or_default(),
                            database = session.parameter("database").unwrap_or_default(),
                            %protocol,
                            "startup"
                        );
                        debug!(pid = self.pid, parameters = ?session.parameters(), "startup parameters");
                        HandshakeState::Authenticating(session)
                    }
                },
                HandshakeState::Authenticating(session) => {
                    self.framed.send(BackendMessage::AuthenticationOk).await?;
                    HandshakeState::Initializing(session)
                }
                HandshakeState::Initializing(session) => {
                    self.send_startup_info(&session).await?;
                    HandshakeState::Ready(session)
                }
                HandshakeState::Ready(session) => {
                    return Ok(HandshakeResult::Success {
                        framed: self.framed.map_codec(StartupCodec::ready),
                        session,
                    });
                }
            };
        }
    }

    async fn read_startup(&mut self) -> Result<StartupMessage, ConnectionError> {
        match self.framed.next().await {
            Some(Ok(message)) => Ok(message),
            Some(Err(e)) => Err(ConnectionError::Handshake(e)),
            None => Err(ConnectionError::Handshake(
                ProtocolError::IncompleteMessage {
                    expected: 8,
                    received: 0,
                },
            )),
        }
    }

    /// Answers an SSL or GSSAPI encryption request with 'N'.
    /// The write buffer is empty here, so the byte goes straight to the socket.
    async fn refuse_encryption(&mut self) -> Result<(), ConnectionError> {
        debug!(pid = self.pid, "refusing encryption request");
        let socket = self.framed.get_mut();
        socket.write_all(b"N").await?;
        socket.flush().await?;
        Ok(())
    }

    async fn send_startup_info(&mut self, session: &Session) -> Result<(), ConnectionError> {
        for (name, value) in SERVER_PARAMETERS {
            self.framed
                .feed(BackendMessage::ParameterStatus {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .await?;
        }

        self.framed
            .feed(BackendMessage::BackendKeyData {
                process_id: session.process_id(),
                secret_key: session.secret_key(),
            })
            .await?;

        self.framed
            .feed(BackendMessage::ReadyForQuery {
                status: TransactionStatus::Idle,
            })
            .await?;

        self.framed.flush().await?;
        Ok(())
    }
}
