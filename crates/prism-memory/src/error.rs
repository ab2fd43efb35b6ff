//! Error types for prism-memory

use thiserror::Error;

/// Memory store error
#[derive(Debug, Error)]
pub enum Error {
    /// SQLite database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested record not found.
    #[error("entry not found: {0}")]
    NotFound(String),

    /// File system I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Unrecoverable internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
