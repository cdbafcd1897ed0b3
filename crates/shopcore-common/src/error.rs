//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common utilities
pub type Result<T> = std::result::Result<T, CommonError>;

/// Error type for shared utilities
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Configuration error: {0}")]
    Config(String),
}
