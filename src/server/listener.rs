use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::ServerConfig;
use crate::server::connection::{Connection, ConnectionError};
use crate::server::handshake::{Handshake, HandshakeResult};

/// Pause after a failed accept before trying again.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Failure to start the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// TCP server implementing PostgreSQL wire protocol.
///
/// Holds no per-connection state: every accepted client gets its own task,
/// and its session lives only inside that task.
pub struct Server {
    listener: TcpListener,
    next_pid: i32,
}

impl Server {
    /// Creates a new server with a given listener.
    pub fn new(listener: TcpListener) -> Self {
        Self {
            listener,
            next_pid: 1,
        }
    }

    /// Binds the configured address.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let addr = config.address();
        match TcpListener::bind(&addr).await {
            Ok(listener) => Ok(Self::new(listener)),
            Err(source) => Err(ServerError::Bind { addr, source }),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Starts accepting connections and serving clients. Never returns.
    ///
    /// A failed accept is logged and the loop carries on. There is no limit
    /// on concurrent connections and no idle timeout.
    pub async fn serve(mut self) {
        match self.listener.local_addr() {
            Ok(addr) => info!(%addr, "listening"),
            Err(e) => warn!(error = %e, "listening on unknown address"),
        }

        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    // Errors like EMFILE persist until a connection closes.
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            };

            let pid = self.allocate_pid();
            info!(pid, %peer, "accepted connection");

            tokio::spawn(handle_connection(socket, pid).instrument(info_span!(
                "connection",
                pid,
                %peer
            )));
        }
    }

    fn allocate_pid(&mut self) -> i32 {
        let pid = self.next_pid;
        self.next_pid = pid.checked_add(1).unwrap_or(1);
        pid
    }
}

/// Drives one client from startup to disconnect.
///
/// The socket is owned by this future and closed when it completes, on
/// every path. Errors stay here; they never reach the accept loop.
pub(crate) async fn handle_connection<S>(socket: S, pid: i32)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match run_connection(socket, pid).await {
        Ok(()) => info!(pid, "client disconnected"),
        Err(e @ ConnectionError::Handshake(_)) => warn!(pid, error = %e, "handshake aborted"),
        Err(e) => error!(pid, error = %e, "connection error"),
    }
    info!(pid, "connection closed");
}

async fn run_connection<S>(socket: S, pid: i32) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut connection = match Handshake::new(socket, pid).run().await? {
        HandshakeResult::Success { framed, session } => Connection::new(framed, session),
        HandshakeResult::CancelRequested {
            pid: target_pid, ..
        } => {
            // No query ever runs long enough to be cancelled.
            info!(pid, target_pid, "ignoring cancel request");
            return Ok(());
        }
    };

    info!(
        pid,
        user = connection.session().user().unwrap_or_default(),
        "connection ready"
    );
    connection.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    use crate::protocol::{BackendMessage, TransactionStatus};
    use crate::server::test_support::{frontend_message, read_message, startup_packet};

    #[tokio::test]
    async fn test_allocate_pid_wraps() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut server = Server::new(listener);

        assert_eq!(server.allocate_pid(), 1);
        assert_eq!(server.allocate_pid(), 2);
        server.next_pid = i32::MAX;
        assert_eq!(server.allocate_pid(), i32::MAX);
        assert_eq!(server.allocate_pid(), 1);
    }

    #[test]
    fn test_accept_backoff_is_short() {
        assert!(ACCEPT_ERROR_BACKOFF > Duration::ZERO);
        assert!(ACCEPT_ERROR_BACKOFF < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let result = Server::bind(&ServerConfig::new("127.0.0.1", port)).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_handle_connection_full_session() {
        let (mut client, server) = duplex(4096);
        let task = tokio::spawn(handle_connection(server, 9));

        client
            .write_all(&startup_packet(b"user\0alice\0\0"))
            .await
            .unwrap();
        for _ in 0..7 {
            read_message(&mut client).await;
        }
        assert_eq!(
            read_message(&mut client).await,
            BackendMessage::ReadyForQuery {
                status: TransactionStatus::Idle
            }
        );

        client
            .write_all(&frontend_message(b'Q', b"SELECT 1\0"))
            .await
            .unwrap();
        assert_eq!(
            read_message(&mut client).await,
            BackendMessage::CommandComplete {
                tag: "SET".to_string()
            }
        );
        read_message(&mut client).await;

        client.shutdown().await.unwrap();
        task.await.unwrap();

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_handle_connection_releases_on_bad_startup() {
        let (mut client, server) = duplex(4096);
        let task = tokio::spawn(handle_connection(server, 10));

        client.write_all(&[0, 0, 0]).await.unwrap();
        client.shutdown().await.unwrap();
        task.await.unwrap();

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }
}
