//! WebSocket route settings.

use hermes_router::{DispatchResult, RouteSettings};
use std::collections::BTreeSet;
use std::time::Duration;

/// Default frame payload buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Settings for a [`WebSocketRoute`](crate::WebSocketRoute).
///
/// An empty subprotocol set accepts any subprotocol; an empty origin set
/// accepts any origin. Settings are fixed once the route is built.
#[derive(Debug, Clone)]
pub struct WebSocketRouteSettings {
    /// Path pattern and secure-port requirement.
    pub route: RouteSettings,
    /// Accepted subprotocols. Empty accepts any.
    pub valid_subprotocols: BTreeSet<String>,
    /// Accepted `Origin` header values. Empty accepts any.
    pub valid_origins: BTreeSet<String>,
    /// Whether pings are answered with pongs automatically (default: true).
    pub auto_ping_pong: bool,
    /// Whether the route pings idle connections (default: true).
    pub keep_alive: bool,
    /// Keep-alive ping cadence (default: 30 seconds).
    pub ping_interval: Duration,
    /// Close the connection if nothing arrives for this long (default: 60 seconds).
    pub receive_timeout: Duration,
    /// Bound on each individual send, including inside broadcasts (default: 5 seconds).
    pub send_timeout: Duration,
    /// How long `stop` waits for serving tasks to drain (default: 1 second).
    pub poll_timeout: Duration,
    /// Maximum frame payload size in bytes (default: 8192).
    pub buffer_size: usize,
}

impl Default for WebSocketRouteSettings {
    fn default() -> Self {
        Self {
            route: RouteSettings::new(),
            valid_subprotocols: BTreeSet::new(),
            valid_origins: BTreeSet::new(),
            auto_ping_pong: true,
            keep_alive: true,
            ping_interval: Duration::from_secs(30),
            receive_timeout: Duration::from_secs(60),
            send_timeout: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(1),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl WebSocketRouteSettings {
    /// Create settings with the catch-all path pattern.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the path pattern.
    pub fn path_pattern(mut self, pattern: &str) -> DispatchResult<Self> {
        let require_secure = self.route.requires_secure_port();
        self.route = RouteSettings::with_path_pattern(pattern)?.require_secure_port(require_secure);
        Ok(self)
    }

    /// Restrict the route to secure listeners.
    pub fn require_secure_port(mut self, require: bool) -> Self {
        self.route = self.route.require_secure_port(require);
        self
    }

    /// Add an accepted subprotocol.
    pub fn valid_subprotocol(mut self, subprotocol: impl Into<String>) -> Self {
        self.valid_subprotocols.insert(subprotocol.into());
        self
    }

    /// Add an accepted origin.
    pub fn valid_origin(mut self, origin: impl Into<String>) -> Self {
        self.valid_origins.insert(origin.into());
        self
    }

    /// Set automatic pong replies.
    pub fn auto_ping_pong(mut self, enabled: bool) -> Self {
        self.auto_ping_pong = enabled;
        self
    }

    /// Set keep-alive pinging.
    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = enabled;
        self
    }

    /// Set the keep-alive ping cadence.
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set the receive timeout.
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Set the per-send timeout.
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the teardown drain bound.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the frame payload buffer size.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Whether the given subprotocol is acceptable.
    pub fn accepts_subprotocol(&self, subprotocol: &str) -> bool {
        self.valid_subprotocols.is_empty()
            || self
                .valid_subprotocols
                .iter()
                .any(|p| p.eq_ignore_ascii_case(subprotocol))
    }

    /// Whether the given origin is acceptable.
    pub fn accepts_origin(&self, origin: &str) -> bool {
        self.valid_origins.is_empty()
            || self
                .valid_origins
                .iter()
                .any(|o| o.eq_ignore_ascii_case(origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = WebSocketRouteSettings::default();
        assert_eq!(settings.route.path_pattern(), "/.*");
        assert!(!settings.route.requires_secure_port());
        assert!(settings.valid_subprotocols.is_empty());
        assert!(settings.valid_origins.is_empty());
        assert!(settings.auto_ping_pong);
        assert!(settings.keep_alive);
        assert_eq!(settings.buffer_size, 8192);
    }

    #[test]
    fn test_empty_sets_accept_anything() {
        let settings = WebSocketRouteSettings::default();
        assert!(settings.accepts_subprotocol("chat"));
        assert!(settings.accepts_origin("https://anywhere.example"));
    }

    #[test]
    fn test_nonempty_sets_restrict() {
        let settings = WebSocketRouteSettings::new()
            .valid_subprotocol("json")
            .valid_origin("https://app.example");

        assert!(settings.accepts_subprotocol("json"));
        assert!(settings.accepts_subprotocol("JSON"));
        assert!(!settings.accepts_subprotocol("chat"));

        assert!(settings.accepts_origin("https://app.example"));
        assert!(!settings.accepts_origin("https://evil.example"));
    }

    #[test]
    fn test_path_pattern_setter() {
        let settings = WebSocketRouteSettings::new()
            .require_secure_port(true)
            .path_pattern("/ws/.*")
            .unwrap();
        assert_eq!(settings.route.path_pattern(), "/ws/.*");
        // The secure-port flag survives a pattern change.
        assert!(settings.route.requires_secure_port());
    }

    #[test]
    fn test_timeout_setters() {
        let settings = WebSocketRouteSettings::new()
            .receive_timeout(Duration::from_secs(5))
            .send_timeout(Duration::from_millis(100))
            .poll_timeout(Duration::from_millis(250))
            .buffer_size(1024);

        assert_eq!(settings.receive_timeout, Duration::from_secs(5));
        assert_eq!(settings.send_timeout, Duration::from_millis(100));
        assert_eq!(settings.poll_timeout, Duration::from_millis(250));
        assert_eq!(settings.buffer_size, 1024);
    }
}
