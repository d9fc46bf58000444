//! Record handlers.

use super::common::parse_json;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::tables;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tabula_catalog::Record;

/// Response for listing records.
#[derive(Debug, Serialize)]
pub struct ListRecordsResponse {
    pub records: Vec<Record>,
}

/// Identifier of a created record.
#[derive(Debug, Serialize)]
pub struct CreateRecordResponse {
    pub id: i64,
}

fn parse_fields(body: &Bytes) -> ApiResult<Record> {
    match parse_json::<Value>(body)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(ApiError::BadRequest("record body must be a JSON object".to_string())),
    }
}

/// GET /v1/sites/{site_id}/tables/{table_ref}/records - List a table's records.
pub async fn list_records(
    State(state): State<AppState>,
    Path((site_id, table_ref)): Path<(i64, String)>,
) -> ApiResult<Json<ListRecordsResponse>> {
    let records = tables::list_records(&state, site_id, &table_ref).await?;
    Ok(Json(ListRecordsResponse { records }))
}

/// POST /v1/sites/{site_id}/tables/{table_ref}/records - Insert a record.
pub async fn create_record(
    State(state): State<AppState>,
    Path((site_id, table_ref)): Path<(i64, String)>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<CreateRecordResponse>)> {
    let fields = parse_fields(&body)?;
    let id = tables::create_record(&state, site_id, &table_ref, &fields).await?;
    Ok((StatusCode::CREATED, Json(CreateRecordResponse { id })))
}

/// PATCH /v1/sites/{site_id}/tables/{table_ref}/records/{id} - Update a record.
pub async fn update_record(
    State(state): State<AppState>,
    Path((site_id, table_ref, id)): Path<(i64, String, i64)>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let fields = parse_fields(&body)?;
    tables::update_record(&state, site_id, &table_ref, id, &fields).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/tables/{table_id}/records/{id} - Delete a record.
pub async fn delete_record(
    State(state): State<AppState>,
    Path((table_id, id)): Path<(String, i64)>,
) -> ApiResult<StatusCode> {
    tables::delete_record(&state, &table_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
