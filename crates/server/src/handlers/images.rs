//! Record image handlers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::tables;
use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::Serialize;
use tabula_storage::image::content_type_for_key;

/// Multipart form field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Stored image key.
#[derive(Debug, Serialize)]
pub struct UploadImageResponse {
    pub key: String,
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(format!("invalid multipart body: {}", e.body_text()))
    }
}

/// POST /v1/tables/{table_id}/records/{id}/image - Attach an image to a record.
pub async fn upload_image(
    State(state): State<AppState>,
    Path((table_id, id)): Path<(String, i64)>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadImageResponse>)> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("image").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(multipart_error)?;

        let key =
            tables::upload_image(&state, &table_id, id, &file_name, &content_type, data).await?;
        return Ok((StatusCode::CREATED, Json(UploadImageResponse { key })));
    }

    Err(ApiError::BadRequest(format!("multipart field '{IMAGE_FIELD}' is required")))
}

/// GET /v1/tables/{table_id}/records/{id}/image - Download a record's image.
pub async fn get_image(
    State(state): State<AppState>,
    Path((table_id, id)): Path<(String, i64)>,
) -> ApiResult<impl IntoResponse> {
    let (key, data) = tables::get_image(&state, &table_id, id).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for_key(&key))], data))
}

/// DELETE /v1/tables/{table_id}/records/{id}/image - Remove a record's image.
pub async fn delete_image(
    State(state): State<AppState>,
    Path((table_id, id)): Path<(String, i64)>,
) -> ApiResult<StatusCode> {
    tables::delete_image(&state, &table_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
