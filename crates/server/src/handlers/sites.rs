//! Site handlers.

use super::common::{SiteResponse, parse_json, site_row_to_response};
use crate::error::ApiResult;
use crate::state::AppState;
use crate::tables;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Create site request.
#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    pub name: String,
}

/// Response for listing sites.
#[derive(Debug, Serialize)]
pub struct ListSitesResponse {
    pub sites: Vec<SiteResponse>,
}

/// GET /v1/sites - List all sites.
pub async fn list_sites(State(state): State<AppState>) -> ApiResult<Json<ListSitesResponse>> {
    let sites = tables::list_sites(&state)
        .await?
        .into_iter()
        .map(site_row_to_response)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(ListSitesResponse { sites }))
}

/// POST /v1/sites - Create a site.
pub async fn create_site(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<SiteResponse>)> {
    let req: CreateSiteRequest = parse_json(&body)?;
    let site = tables::create_site(&state, &req.name).await?;
    Ok((StatusCode::CREATED, Json(site_row_to_response(site)?)))
}

/// GET /v1/sites/{site_id} - Get a site.
pub async fn get_site(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
) -> ApiResult<Json<SiteResponse>> {
    let site = tables::require_site(&state, site_id).await?;
    Ok(Json(site_row_to_response(site)?))
}
