//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};
use tabula_catalog::CatalogError;
use tabula_core::SchemaOp;
use tabula_storage::StorageError;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Structured context, e.g. which schema operations were applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("internal error: {0}")]
    Internal(String),

    /// Column operations committed but the following rename did not.
    #[error(
        "rename to '{table_name}' failed after {} schema operation(s): {source}",
        .applied.len()
    )]
    RenameFailed {
        table_name: String,
        applied: Vec<SchemaOp>,
        source: CatalogError,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Core(#[from] tabula_core::Error),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Internal(_) => "internal_error",
            Self::RenameFailed { .. } => "partial_failure",
            Self::Catalog(e) => match e {
                CatalogError::NotFound(_) => "not_found",
                CatalogError::AlreadyExists(_) => "conflict",
                CatalogError::Forbidden(_) => "forbidden",
                CatalogError::Invalid(_) => "validation_error",
                CatalogError::Database(_) => "backend_error",
                CatalogError::PartialFailure { .. } => "partial_failure",
                _ => "internal_error",
            },
            Self::Storage(e) => match e {
                StorageError::NotFound(_) => "not_found",
                StorageError::InvalidKey(_) => "bad_request",
                StorageError::UnsupportedMediaType(_) => "unsupported_media_type",
                StorageError::TooLarge { .. } => "payload_too_large",
                _ => "storage_error",
            },
            Self::Core(_) => "validation_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) | Self::RenameFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Catalog(e) => match e {
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::AlreadyExists(_) => StatusCode::CONFLICT,
                CatalogError::Forbidden(_) => StatusCode::FORBIDDEN,
                CatalogError::Invalid(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Storage(e) => match e {
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                StorageError::InvalidKey(_) => StatusCode::BAD_REQUEST,
                StorageError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                StorageError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Structured context attached to the response body.
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Catalog(CatalogError::PartialFailure {
                failed, applied, ..
            }) => Some(json!({
                "applied": applied,
                "failed": failed,
            })),
            Self::RenameFailed {
                table_name,
                applied,
                ..
            } => Some(json!({
                "applied": applied,
                "failed": { "op": "rename", "table_name": table_name },
            })),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
