//! Error types for trellis
//!
//! ## Table of Contents
//! - **TrellisError**: Main error enum covering all failure modes
//! - **Result**: Type alias for `Result<T, TrellisError>`
//!
//! Infeasibility of a placement is deliberately *not* an error: the engine
//! reports it as an absent assignment (`Ok(None)`). Errors are reserved for
//! misuse (invalid configuration or request) and collaborator failures.

use thiserror::Error;

/// Result type alias for trellis operations
pub type Result<T> = std::result::Result<T, TrellisError>;

/// Main error type for trellis operations
#[derive(Error, Debug)]
pub enum TrellisError {
    /// Invalid topology configuration (levels, node filter)
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed placement request (count, per-unit resources, level name)
    #[error("invalid placement request: {0}")]
    Request(String),

    /// Node source failure while listing cluster nodes
    #[error("node source error: {0}")]
    Source(String),

    /// Generic IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not occur in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}

impl TrellisError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a request error
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    /// Create a node source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrellisError::config("levels must not be empty");
        assert_eq!(
            err.to_string(),
            "configuration error: levels must not be empty"
        );

        let err = TrellisError::request("count must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid placement request: count must be at least 1"
        );
    }
}
