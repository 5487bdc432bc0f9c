//! Route settings.

use crate::error::{DispatchError, DispatchResult};
use regex::Regex;

/// The default path pattern. Matches every request path.
pub const DEFAULT_PATH_PATTERN: &str = "/.*";

/// Immutable matching criteria for one route.
///
/// The path pattern is a regex matched against the whole request path
/// (anchored at both ends). `require_secure_port` restricts the route to
/// listeners flagged as secure.
///
/// # Example
///
/// ```
/// use hermes_router::RouteSettings;
///
/// let settings = RouteSettings::with_path_pattern("/api/.*")
///     .unwrap()
///     .require_secure_port(true);
///
/// assert!(settings.matches_path("/api/items"));
/// assert!(!settings.matches_path("/health"));
/// ```
#[derive(Debug, Clone)]
pub struct RouteSettings {
    /// Anchored path pattern.
    pattern: Regex,
    /// The pattern as supplied, for display.
    pattern_source: String,
    /// Whether the route only matches on secure listeners.
    require_secure_port: bool,
}

impl RouteSettings {
    /// Creates settings with the default catch-all pattern.
    #[must_use]
    pub fn new() -> Self {
        Self::with_path_pattern(DEFAULT_PATH_PATTERN)
            .expect("default path pattern is valid")
    }

    /// Creates settings with the given path pattern.
    ///
    /// The pattern is anchored: it must match the entire request path.
    pub fn with_path_pattern(pattern: &str) -> DispatchResult<Self> {
        let anchored = format!("\\A(?:{pattern})\\z");
        let compiled = Regex::new(&anchored)
            .map_err(|source| DispatchError::invalid_pattern(pattern, source))?;
        Ok(Self {
            pattern: compiled,
            pattern_source: pattern.to_string(),
            require_secure_port: false,
        })
    }

    /// Restricts the route to secure listeners.
    #[must_use]
    pub fn require_secure_port(mut self, require: bool) -> Self {
        self.require_secure_port = require;
        self
    }

    /// The path pattern as supplied at construction.
    #[must_use]
    pub fn path_pattern(&self) -> &str {
        &self.pattern_source
    }

    /// Whether this route only matches on secure listeners.
    #[must_use]
    pub fn requires_secure_port(&self) -> bool {
        self.require_secure_port
    }

    /// Tests the pattern against a request path. Deterministic; no state.
    #[must_use]
    pub fn matches_path(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self::new()
    }
}
