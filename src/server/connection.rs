mod error;

pub use error::ConnectionError;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::debug;

use crate::protocol::{BackendMessage, PostgresCodec, TransactionStatus};
use crate::session::Session;

/// Command tag acknowledged for every client message.
pub const COMMAND_TAG: &str = "SET";

/// A single client connection in the query phase.
///
/// Every message the client sends, whatever its type or payload, is answered
/// with `CommandComplete("SET")` followed by `ReadyForQuery('I')`. Nothing is
/// parsed or executed.
pub struct Connection<S> {
    framed: Framed<S, PostgresCodec>,
    session: Session,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    pub fn new(framed: Framed<S, PostgresCodec>, session: Session) -> Self {
        Self { framed, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Serves messages until the client closes the stream.
    ///
    /// Returns `Ok(())` on a clean close between messages and the error for
    /// anything else, including a close in the middle of a message.
    pub async fn run(&mut self) -> Result<(), ConnectionError> {
        loop {
            if self.handle_message().await? {
                return Ok(());
            }
        }
    }

    /// Handle a single message from the client.
    /// Returns true if the connection should terminate.
    async fn handle_message(&mut self) -> Result<bool, ConnectionError> {
        let message = match self.framed.next().await {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => return Err(e.into()),
            None => return Ok(true), // EOF - client disconnected
        };

        debug!(
            pid = self.session.process_id(),
            tag = %char::from(message.tag),
            len = message.payload.len(),
            "message"
        );

        self.framed
            .feed(BackendMessage::CommandComplete {
                tag: COMMAND_TAG.to_string(),
            })
            .await?;
        self.framed
            .feed(BackendMessage::ReadyForQuery {
                status: TransactionStatus::Idle,
            })
            .await?;
        self.framed.flush().await?;
        Ok(false)
    }
}
