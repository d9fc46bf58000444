//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error(
        "invalid column type '{ty}' for column '{column}' (expected e.g. VARCHAR(100), INT, DATETIME or IMAGE)"
    )]
    InvalidColumnType { column: String, ty: String },

    #[error("invalid column name: {0}")]
    InvalidColumnName(String),

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid table name: {0}")]
    InvalidTableName(String),

    #[error("unsupported value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
