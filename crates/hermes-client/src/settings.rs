//! Client session settings.

use http::HeaderMap;
use std::time::Duration;

use base64::Engine;

/// Default User-Agent string sent with every request.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; Hermes/0.1 +https://github.com/hermes-rs/hermes)";

/// Default redirect budget per submitted request.
pub const DEFAULT_MAX_REDIRECTS: u32 = 20;

/// Default minimum bytes between progress updates.
pub const DEFAULT_BYTES_PER_UPDATE: u64 = 1024;

/// Settings for a [`ClientSession`](crate::ClientSession).
///
/// An immutable value object: build it, hand it to the session, done.
#[derive(Debug, Clone)]
pub struct ClientSessionSettings {
    /// User-Agent header value (default: the Hermes agent string).
    pub user_agent: String,
    /// Redirect budget per request (default: 20).
    pub max_redirects: u32,
    /// Whether connections are pooled between requests (default: true).
    pub keep_alive: bool,
    /// Idle timeout for pooled connections (default: 8 seconds).
    pub keep_alive_timeout: Duration,
    /// Overall request timeout (default: 60 seconds).
    pub timeout: Duration,
    /// Minimum transferred bytes between progress updates (default: 1024).
    pub bytes_per_update: u64,
    /// Maximum time between progress updates (default: 1 second).
    pub max_update_interval: Duration,
    /// Headers added to every request that does not already carry them.
    pub default_headers: HeaderMap,
    /// Proxy to route requests through, if any.
    pub proxy: Option<ProxySettings>,
}

impl Default for ClientSessionSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            keep_alive: true,
            keep_alive_timeout: Duration::from_secs(8),
            timeout: Duration::from_secs(60),
            bytes_per_update: DEFAULT_BYTES_PER_UPDATE,
            max_update_interval: Duration::from_secs(1),
            default_headers: HeaderMap::new(),
            proxy: None,
        }
    }
}

impl ClientSessionSettings {
    /// Create settings with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the User-Agent string.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the redirect budget.
    #[must_use]
    pub fn max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = max;
        self
    }

    /// Set connection pooling.
    #[must_use]
    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = enabled;
        self
    }

    /// Set the pooled-connection idle timeout.
    #[must_use]
    pub fn keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.keep_alive_timeout = timeout;
        self
    }

    /// Set the overall request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the minimum bytes between progress updates.
    #[must_use]
    pub fn bytes_per_update(mut self, bytes: u64) -> Self {
        self.bytes_per_update = bytes;
        self
    }

    /// Set the maximum time between progress updates.
    #[must_use]
    pub fn max_update_interval(mut self, interval: Duration) -> Self {
        self.max_update_interval = interval;
        self
    }

    /// Add a default header.
    #[must_use]
    pub fn default_header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    /// Route requests through a proxy.
    #[must_use]
    pub fn proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = Some(proxy);
        self
    }
}

/// Proxy host, port, and optional credentials.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// Proxy host.
    pub host: String,
    /// Proxy port.
    pub port: u16,
    /// Username for proxy authentication.
    pub username: Option<String>,
    /// Password for proxy authentication.
    pub password: Option<String>,
}

impl ProxySettings {
    /// Create proxy settings without credentials.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    /// Set the proxy credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Whether credentials are configured.
    pub fn has_credentials(&self) -> bool {
        self.username.is_some()
    }

    /// The proxy URL.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// The `Proxy-Authorization` value for the configured credentials, if any.
    pub fn basic_auth_value(&self) -> Option<String> {
        let username = self.username.as_deref()?;
        let password = self.password.as_deref().unwrap_or("");
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        Some(format!("Basic {encoded}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ClientSessionSettings::default();
        assert_eq!(settings.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(settings.max_redirects, 20);
        assert!(settings.keep_alive);
        assert_eq!(settings.keep_alive_timeout, Duration::from_secs(8));
        assert_eq!(settings.timeout, Duration::from_secs(60));
        assert_eq!(settings.bytes_per_update, 1024);
        assert_eq!(settings.max_update_interval, Duration::from_secs(1));
        assert!(settings.proxy.is_none());
    }

    #[test]
    fn test_builder() {
        let settings = ClientSessionSettings::new()
            .user_agent("test-agent/1.0")
            .max_redirects(3)
            .keep_alive(false)
            .bytes_per_update(64);

        assert_eq!(settings.user_agent, "test-agent/1.0");
        assert_eq!(settings.max_redirects, 3);
        assert!(!settings.keep_alive);
        assert_eq!(settings.bytes_per_update, 64);
    }

    #[test]
    fn test_proxy_url() {
        let proxy = ProxySettings::new("proxy.example", 3128);
        assert_eq!(proxy.url(), "http://proxy.example:3128");
        assert!(!proxy.has_credentials());
        assert!(proxy.basic_auth_value().is_none());
    }

    #[test]
    fn test_proxy_basic_auth() {
        let proxy = ProxySettings::new("proxy.example", 3128).credentials("aladdin", "opensesame");
        assert!(proxy.has_credentials());
        assert_eq!(
            proxy.basic_auth_value().unwrap(),
            "Basic YWxhZGRpbjpvcGVuc2VzYW1l"
        );
    }
}
