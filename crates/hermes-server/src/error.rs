//! Server error types.

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised while starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address could not be bound.
    #[error("failed to bind {addr}: {reason}")]
    Bind {
        /// The address that failed.
        addr: String,
        /// Why binding failed.
        reason: String,
    },

    /// I/O error while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Create a bind error.
    pub fn bind(addr: impl Into<String>, reason: impl ToString) -> Self {
        Self::Bind {
            addr: addr.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_names_address() {
        let err = ServerError::bind("0.0.0.0:80", "permission denied");
        assert_eq!(err.to_string(), "failed to bind 0.0.0.0:80: permission denied");
    }
}
