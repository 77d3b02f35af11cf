//! Per-connection session state.
//!
//! A [`Session`] is created by the handshake of exactly one connection and
//! is owned by that connection's task until it ends. It is never stored on
//! the listener or shared between connections.

use crate::protocol::StartupParameters;

/// Negotiated state of a single client session.
#[derive(Debug, Clone)]
pub struct Session {
    parameters: StartupParameters,
    process_id: i32,
    secret_key: i32,
}

impl Session {
    /// Creates the session for a freshly decoded startup packet.
    pub fn new(parameters: StartupParameters, process_id: i32, secret_key: i32) -> Self {
        Self {
            parameters,
            process_id,
            secret_key,
        }
    }

    /// Client-supplied startup parameters, in the order they were sent.
    pub fn parameters(&self) -> &StartupParameters {
        &self.parameters
    }

    /// Returns a startup parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name)
    }

    /// The `user` startup parameter, if the client sent one.
    pub fn user(&self) -> Option<&str> {
        self.parameter("user")
    }

    pub fn process_id(&self) -> i32 {
        self.process_id
    }

    pub fn secret_key(&self) -> i32 {
        self.secret_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lookup() {
        let params: StartupParameters = [("user", "alice"), ("database", "shop")]
            .into_iter()
            .collect();
        let session = Session::new(params, 3, 99);

        assert_eq!(session.user(), Some("alice"));
        assert_eq!(session.parameter("database"), Some("shop"));
        assert_eq!(session.parameter("application_name"), None);
        assert_eq!(session.parameters().len(), 2);
        assert_eq!(session.process_id(), 3);
        assert_eq!(session.secret_key(), 99);
    }

    #[test]
    fn test_session_without_user() {
        let session = Session::new(StartupParameters::default(), 1, 0);
        assert_eq!(session.user(), None);
    }

    #[test]
    fn test_sessions_are_independent() {
        let a = Session::new([("user", "alice")].into_iter().collect(), 1, 10);
        let b = Session::new([("user", "bob")].into_iter().collect(), 2, 20);
        assert_eq!(a.user(), Some("alice"));
        assert_eq!(b.user(), Some("bob"));
    }
}
