//! PostgreSQL wire protocol framing.
//!
//! Only the slice of the v3.0 protocol needed for connection setup and a
//! placeholder query loop is implemented: the frontend startup packet, a
//! generic tagged frontend frame, and five backend message kinds.
//!
//! ## Architecture
//!
//! ```text
//! +----------+                             +----------+
//! |  Client  |  --- StartupMessage ----->  |  Server  |
//! |  (psql)  |  --- FrontendMessage ---->  | (pgfront)|
//! |          |  <-- BackendMessage  -----  |          |
//! +----------+                             +----------+
//!               ^                     ^
//!               | StartupCodec  then  |
//!               |   PostgresCodec     |
//!               +---------------------+
//! ```
//!
//! ## Terminology
//!
//! - **StartupMessage**: the untagged first packet (plus SSL/GSS/cancel requests)
//! - **FrontendMessage**: any tagged client message after startup; payload is opaque
//! - **BackendMessage**: messages from server to client
//! - **Codec**: length-prefixed framing for both connection phases

pub mod backend;
pub mod codec;
pub mod error;
pub mod frontend;

pub use backend::{BackendMessage, TransactionStatus};
pub use codec::{PostgresCodec, StartupCodec};
pub use error::ProtocolError;
pub use frontend::{FrontendMessage, StartupMessage, StartupParameters};
