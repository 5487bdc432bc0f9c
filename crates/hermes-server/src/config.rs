//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Default bind address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings for a [`Server`](crate::Server).
///
/// Built once, immutable afterwards.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    bind_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    secure: bool,
}

impl ServerConfig {
    /// Create a configuration builder.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// The configured bind address string.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// The bind address parsed as a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind_addr.parse()
    }

    /// How long shutdown waits for in-flight connections.
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Bound on body collection and route handling per request.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Whether this listener counts as a secure port for route matching.
    ///
    /// Routes that require a secure port only match requests arriving on a
    /// listener with this flag set. Transport security itself is handled
    /// in front of the server.
    pub fn is_secure(&self) -> bool {
        self.secure
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    bind_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    secure: bool,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            secure: false,
        }
    }
}

impl ServerConfigBuilder {
    /// Create a builder with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address, e.g. `"127.0.0.1:3000"`.
    #[must_use]
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Set the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Mark this listener as a secure port.
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind_addr,
            shutdown_timeout: self.shutdown_timeout,
            request_timeout: self.request_timeout,
            secure: self.secure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(!config.is_secure());
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::builder()
            .bind_addr("127.0.0.1:3000")
            .shutdown_timeout(Duration::from_secs(5))
            .secure(true)
            .build();

        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
        assert!(config.is_secure());
    }

    #[test]
    fn test_socket_addr_parse() {
        let config = ServerConfig::builder().bind_addr("127.0.0.1:9000").build();
        assert!(config.socket_addr().is_ok());

        let bad = ServerConfig::builder().bind_addr("nonsense").build();
        assert!(bad.socket_addr().is_err());
    }
}
