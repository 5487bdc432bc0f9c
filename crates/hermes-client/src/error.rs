//! Error types for client operations.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client pipeline.
///
/// Every terminal error is also announced on the session's error event
/// before it reaches the caller.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The redirect budget was spent without reaching a final response.
    #[error("redirect limit exceeded after {limit} redirects")]
    RedirectLimitExceeded {
        /// The configured budget.
        limit: u32,
    },

    /// A redirect response carried no usable Location header.
    #[error("redirect response without a usable Location header: {reason}")]
    InvalidRedirect {
        /// Why the Location could not be used.
        reason: String,
    },

    /// A filter aborted the pipeline.
    #[error(transparent)]
    Filter(#[from] hermes_filter::FilterError),

    /// The request URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The underlying HTTP transport failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Reading the response body failed.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The session could not be constructed.
    #[error("failed to build client session: {0}")]
    Session(String),
}

impl ClientError {
    /// Create a redirect limit error.
    pub fn redirect_limit_exceeded(limit: u32) -> Self {
        Self::RedirectLimitExceeded { limit }
    }

    /// Create an invalid redirect error.
    pub fn invalid_redirect(reason: impl Into<String>) -> Self {
        Self::InvalidRedirect {
            reason: reason.into(),
        }
    }

    /// Create a body read error.
    pub fn body(reason: impl Into<String>) -> Self {
        Self::Body(reason.into())
    }

    /// Create a session construction error.
    pub fn session(reason: impl Into<String>) -> Self {
        Self::Session(reason.into())
    }
}
