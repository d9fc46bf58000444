//! Catalog error types.

use tabula_core::SchemaOp;
use thiserror::Error;

/// Catalog operation errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid input: {0}")]
    Invalid(#[from] tabula_core::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(
        "schema update stopped at '{failed}' after {} applied operation(s): {source}",
        .applied.len()
    )]
    PartialFailure {
        failed: SchemaOp,
        applied: Vec<SchemaOp>,
        source: Box<CatalogError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
