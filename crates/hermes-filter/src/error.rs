//! Filter error types.

use thiserror::Error;

/// Errors produced by request and response filters.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A filter aborted the chain. No later filter in the same list runs.
    #[error("Filter '{filter}' aborted: {reason}")]
    Aborted {
        /// Name of the filter that aborted.
        filter: String,
        /// Why the filter aborted.
        reason: String,
    },

    /// A filter tried to set a header with an invalid name or value.
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader {
        /// Header name.
        name: String,
        /// Why the header was rejected.
        reason: String,
    },

    /// A filter required state that was not present in the context.
    #[error("Missing filter state: {0}")]
    MissingState(String),
}

impl FilterError {
    /// Creates an [`FilterError::Aborted`] error.
    pub fn aborted(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Aborted {
            filter: filter.into(),
            reason: reason.into(),
        }
    }

    /// Creates an [`FilterError::InvalidHeader`] error.
    pub fn invalid_header(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`FilterError::MissingState`] error.
    pub fn missing_state(what: impl Into<String>) -> Self {
        Self::MissingState(what.into())
    }
}

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;
