//! Storage error types.

use thiserror::Error;

/// Blob storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("blob too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
