//! Error types for pairlog-core
//!
//! Only the I/O edges (log files, the SQLite store, config files) return
//! errors. The analytics themselves are total and degrade to documented
//! defaults instead.

use thiserror::Error;

/// Main error type for the pairlog-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error for session logs
    #[error("parse error in {source_file}: {message}")]
    Parse {
        source_file: String,
        message: String,
    },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for pairlog-core
pub type Result<T> = std::result::Result<T, Error>;
