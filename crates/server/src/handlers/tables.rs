//! Table provisioning and schema handlers.

use super::common::{TableResponse, parse_json, table_row_to_response};
use crate::error::ApiResult;
use crate::state::AppState;
use crate::tables::{self, DashboardEntry};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabula_core::{ColumnSpec, PhysicalColumn, SchemaOp};

/// Create table request.
#[derive(Debug, Deserialize)]
pub struct CreateTableRequest {
    #[serde(alias = "tableName")]
    pub table_name: String,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

/// Update schema request. `columns` is the complete desired column set.
#[derive(Debug, Deserialize)]
pub struct UpdateSchemaRequest {
    #[serde(default, alias = "tableName")]
    pub table_name: Option<String>,
    pub columns: Vec<ColumnSpec>,
}

/// Response for listing tables.
#[derive(Debug, Serialize)]
pub struct ListTablesResponse {
    pub tables: Vec<TableResponse>,
}

/// Live columns of a table.
#[derive(Debug, Serialize)]
pub struct DescribeTableResponse {
    pub table_id: String,
    pub columns: Vec<PhysicalColumn>,
}

/// Result of a schema update.
#[derive(Debug, Serialize)]
pub struct UpdateSchemaResponse {
    pub table: TableResponse,
    pub applied: Vec<SchemaOp>,
    pub renamed: bool,
}

/// Physical tables not tracked by any site.
#[derive(Debug, Serialize)]
pub struct UnassociatedResponse {
    pub tables: Vec<String>,
}

/// Display name of a physical table.
#[derive(Debug, Serialize)]
pub struct TableNameResponse {
    pub table_id: String,
    pub table_name: String,
}

fn to_responses(rows: Vec<tabula_catalog::TableRow>) -> ApiResult<Vec<TableResponse>> {
    rows.into_iter().map(table_row_to_response).collect()
}

/// GET /v1/sites/{site_id}/tables - List a site's tables.
pub async fn list_tables(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
) -> ApiResult<Json<ListTablesResponse>> {
    let rows = tables::list_tables(&state, site_id).await?;
    Ok(Json(ListTablesResponse {
        tables: to_responses(rows)?,
    }))
}

/// POST /v1/sites/{site_id}/tables - Create a table.
pub async fn create_table(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<TableResponse>)> {
    let req: CreateTableRequest = parse_json(&body)?;
    let table = tables::create_table(&state, site_id, &req.table_name, &req.columns).await?;
    Ok((StatusCode::CREATED, Json(table_row_to_response(table)?)))
}

/// GET /v1/sites/{site_id}/tables/{table_ref}/schema - Describe a table.
pub async fn describe_table(
    State(state): State<AppState>,
    Path((site_id, table_ref)): Path<(i64, String)>,
) -> ApiResult<Json<DescribeTableResponse>> {
    let (table, columns) = tables::describe_table(&state, site_id, &table_ref).await?;
    Ok(Json(DescribeTableResponse {
        table_id: table.table_id,
        columns,
    }))
}

/// PATCH /v1/sites/{site_id}/tables/{table_ref}/schema - Update a table's schema.
pub async fn update_schema(
    State(state): State<AppState>,
    Path((site_id, table_ref)): Path<(i64, String)>,
    body: Bytes,
) -> ApiResult<Json<UpdateSchemaResponse>> {
    let req: UpdateSchemaRequest = parse_json(&body)?;
    let update = tables::update_schema(
        &state,
        site_id,
        &table_ref,
        req.table_name.as_deref(),
        &req.columns,
    )
    .await?;

    Ok(Json(UpdateSchemaResponse {
        table: table_row_to_response(update.table)?,
        applied: update.applied,
        renamed: update.renamed,
    }))
}

/// POST /v1/sites/{site_id}/associations/{physical_name} - Associate an existing table.
pub async fn associate_table(
    State(state): State<AppState>,
    Path((site_id, physical_name)): Path<(i64, String)>,
) -> ApiResult<(StatusCode, Json<TableResponse>)> {
    let table = tables::associate_table(&state, site_id, &physical_name).await?;
    Ok((StatusCode::CREATED, Json(table_row_to_response(table)?)))
}

/// GET /v1/sites/{site_id}/unassociated - List untracked physical tables.
pub async fn list_unassociated(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
) -> ApiResult<Json<UnassociatedResponse>> {
    let names = tables::list_unassociated(&state, site_id).await?;
    Ok(Json(UnassociatedResponse { tables: names }))
}

/// GET /v1/sites/{site_id}/dashboard - Latest rows of every table in a site.
pub async fn dashboard(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
) -> ApiResult<Json<BTreeMap<String, DashboardEntry>>> {
    Ok(Json(tables::dashboard(&state, site_id).await?))
}

/// GET /v1/tables/{table_id} - Resolve a physical table to its display name.
pub async fn get_table_name(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
) -> ApiResult<Json<TableNameResponse>> {
    let table = tables::tracked_table(&state, &table_id).await?;
    Ok(Json(TableNameResponse {
        table_id: table.table_id,
        table_name: table.table_name,
    }))
}

/// DELETE /v1/tables/{table_id} - Delete a table and its physical storage.
pub async fn delete_table(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
) -> ApiResult<StatusCode> {
    tables::delete_table(&state, &table_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
