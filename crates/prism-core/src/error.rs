//! Error types for prism-core

use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed request or empty query
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// All analyzer invocations failed after retries
    #[error("analyzers unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Per-call or whole-request deadline exceeded
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Memory store failure
    #[error("storage error: {0}")]
    Storage(#[from] prism_memory::Error),

    /// Caller-induced cancellation
    #[error("cancelled")]
    Cancelled,

    /// Any uncategorized fault
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable kind string used in error events and HTTP mapping.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::UpstreamUnavailable(_) => "upstream_unavailable",
            Error::Timeout(_) => "timeout",
            Error::Storage(_) => "storage",
            Error::Cancelled => "cancelled",
            Error::Internal(_) => "internal",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(Error::InvalidInput("x".into()).kind(), "invalid_input");
        assert_eq!(
            Error::UpstreamUnavailable("x".into()).kind(),
            "upstream_unavailable"
        );
        assert_eq!(Error::Timeout(5).kind(), "timeout");
        assert_eq!(Error::Cancelled.kind(), "cancelled");
        assert_eq!(Error::Internal("x".into()).kind(), "internal");
    }
}
