//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, patch, post};
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and part headers around the image bytes.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let image_body_limit = state
        .config
        .server
        .max_image_size
        .saturating_add(MULTIPART_OVERHEAD);

    let site_routes = Router::new()
        .route(
            "/v1/sites",
            get(handlers::list_sites).post(handlers::create_site),
        )
        .route("/v1/sites/{site_id}", get(handlers::get_site))
        .route(
            "/v1/sites/{site_id}/tables",
            get(handlers::list_tables).post(handlers::create_table),
        )
        .route(
            "/v1/sites/{site_id}/tables/{table_ref}/schema",
            get(handlers::describe_table).patch(handlers::update_schema),
        )
        .route(
            "/v1/sites/{site_id}/tables/{table_ref}/records",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/v1/sites/{site_id}/tables/{table_ref}/records/{id}",
            patch(handlers::update_record),
        )
        .route(
            "/v1/sites/{site_id}/associations/{physical_name}",
            post(handlers::associate_table),
        )
        .route(
            "/v1/sites/{site_id}/unassociated",
            get(handlers::list_unassociated),
        )
        .route("/v1/sites/{site_id}/dashboard", get(handlers::dashboard));

    let table_routes = Router::new()
        .route(
            "/v1/tables/{table_id}",
            get(handlers::get_table_name).delete(handlers::delete_table),
        )
        .route(
            "/v1/tables/{table_id}/records/{id}",
            delete(handlers::delete_record),
        )
        .route(
            "/v1/tables/{table_id}/records/{id}/image",
            post(handlers::upload_image)
                .get(handlers::get_image)
                .delete(handlers::delete_image)
                .layer(DefaultBodyLimit::max(image_body_limit)),
        );

    let mut router = Router::new()
        .merge(site_routes)
        .merge(table_routes)
        .route("/v1/events", get(handlers::events))
        // Health check (unauthenticated for load balancers/k8s probes)
        .route("/v1/health", get(handlers::health_check));

    // SECURITY: when enabled, /metrics must be network-restricted to the scrapers.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
