//! Listener configuration.

/// Default host the server binds to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port the server binds to.
pub const DEFAULT_PORT: u16 = 15432;

/// Address the listener binds, given as host and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Renders `host:port`, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address() {
        assert_eq!(ServerConfig::new("localhost", 5432).address(), "localhost:5432");
        assert_eq!(ServerConfig::default().address(), "127.0.0.1:15432");
    }

    #[test]
    fn test_address_ipv6() {
        assert_eq!(ServerConfig::new("::1", 5432).address(), "[::1]:5432");
        assert_eq!(ServerConfig::new("[::1]", 5432).address(), "[::1]:5432");
    }
}
