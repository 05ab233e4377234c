//! Error types for the devscope library.

use thiserror::Error;

/// Top-level error type for devscope operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File open/read/write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Magic mismatch, version mismatch, truncated record, or
    /// impossible length in one of the index files.
    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    /// Malformed query. Reserved; the current grammar accepts
    /// every input string.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Result type for devscope operations.
pub type Result<T> = std::result::Result<T, Error>;
