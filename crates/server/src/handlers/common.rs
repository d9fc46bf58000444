//! Shared handler helpers and response types.

use crate::error::{ApiError, ApiResult};
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tabula_catalog::{SiteRow, TableRow};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Parse a JSON request body.
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))
}

fn format_timestamp(t: OffsetDateTime, field: &str) -> ApiResult<String> {
    t.format(&Rfc3339)
        .map_err(|e| ApiError::Internal(format!("failed to format {field}: {e}")))
}

/// Site as returned by the API.
#[derive(Debug, Serialize)]
pub struct SiteResponse {
    pub id: i64,
    pub name: String,
    pub active: bool,
    pub created_at: String,
}

pub fn site_row_to_response(site: SiteRow) -> ApiResult<SiteResponse> {
    Ok(SiteResponse {
        id: site.id,
        name: site.name,
        active: site.active,
        created_at: format_timestamp(site.created_at, "created_at")?,
    })
}

/// Logical table as returned by the API.
#[derive(Debug, Serialize)]
pub struct TableResponse {
    pub id: i64,
    pub site_id: i64,
    pub table_name: String,
    pub table_id: String,
    pub created_at: String,
}

pub fn table_row_to_response(table: TableRow) -> ApiResult<TableResponse> {
    Ok(TableResponse {
        id: table.id,
        site_id: table.site_id,
        table_name: table.table_name,
        table_id: table.table_id,
        created_at: format_timestamp(table.created_at, "created_at")?,
    })
}
