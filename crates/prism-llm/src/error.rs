//! Error types for prism-llm

use thiserror::Error;

/// Analyzer error type
#[derive(Debug, Error)]
pub enum Error {
    /// Provider not configured
    #[error("analyzer not configured: {0}")]
    NotConfigured(String),

    /// API error
    #[error("api error: {0}")]
    Api(String),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),
}

impl Error {
    /// Whether a retry may succeed.
    ///
    /// Configuration and response-shape errors are terminal; network hiccups,
    /// upstream 5xx and timeouts are worth another attempt.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Api(_) | Error::Network(_) | Error::Timeout(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
