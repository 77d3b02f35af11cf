//! TCP server for PostgreSQL-compatible connections.
//!
//! This module provides the network layer that accepts client connections
//! and drives each one through the startup handshake and the query loop.
//!
//! ## Architecture
//!
//! ```text
//! +--------+
//! | Server |  <- Accepts TCP connections, one task per client
//! +--------+
//!      |
//!      v
//! +-----------+     +------------+
//! | Handshake | --> | Connection |  <- Query loop until the client leaves
//! +-----------+     +------------+
//!      |
//!      v
//! +---------+
//! | Session |  <- Owned by the connection's task, never shared
//! +---------+
//! ```
//!
//! ## Terminology
//!
//! - **Server**: TCP listener that spawns connections
//! - **Handshake**: startup packet, authentication and parameter exchange
//! - **Connection**: per-client query loop answering every message
//! - **Session**: parameters and keys negotiated by one handshake

pub mod connection;
pub mod handshake;
pub mod listener;

pub use connection::{Connection, ConnectionError};
pub use handshake::{Handshake, HandshakeResult};
pub use listener::{Server, ServerError};
