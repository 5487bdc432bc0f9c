//! Dispatch error types.

use thiserror::Error;

/// Errors raised while configuring or running a dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A dispatcher was built without a default handler.
    ///
    /// Unmatched requests always go somewhere; a dispatcher with no default
    /// handler is a configuration mistake caught at startup.
    #[error("Dispatcher requires a default handler for unmatched requests")]
    MissingDefaultHandler,

    /// A route path pattern failed to compile.
    #[error("Invalid route path pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern as supplied.
        pattern: String,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },
}

impl DispatchError {
    /// Creates an [`DispatchError::InvalidPattern`] error.
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
