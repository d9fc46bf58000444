//! Prometheus metrics for the tabula server.
//!
//! Counts table provisioning, schema operations, record writes and change
//! notifications.
//!
//! The `/metrics` endpoint is unauthenticated. It exposes aggregate counts
//! only (no table identifiers or record contents), but it should still be
//! network-restricted to the Prometheus scrapers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{self, Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Table lifecycle
pub static TABLES_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tabula_tables_created_total",
        "Total number of site tables provisioned",
    )
    .expect("metric creation failed")
});

pub static TABLES_DELETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tabula_tables_deleted_total",
        "Total number of site tables dropped",
    )
    .expect("metric creation failed")
});

// Schema migration
pub static SCHEMA_OPS_APPLIED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tabula_schema_ops_applied_total",
            "Schema operations applied, by operation kind",
        ),
        &["op"],
    )
    .expect("metric creation failed")
});

pub static SCHEMA_UPDATES_PARTIAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tabula_schema_updates_partial_total",
        "Schema updates that stopped after some operations were applied",
    )
    .expect("metric creation failed")
});

// Records
pub static RECORDS_WRITTEN: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tabula_records_written_total",
            "Record writes, by kind (insert, update, delete)",
        ),
        &["kind"],
    )
    .expect("metric creation failed")
});

// Notifications
pub static EVENTS_PUBLISHED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tabula_events_published_total",
            "Change events published, by event type",
        ),
        &["event"],
    )
    .expect("metric creation failed")
});

pub static LISTENERS_CONNECTED: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "tabula_listeners_connected",
        "Current number of connected change listeners",
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Safe to call more than once; only the first call registers.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(TABLES_CREATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(TABLES_DELETED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SCHEMA_OPS_APPLIED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SCHEMA_UPDATES_PARTIAL.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(RECORDS_WRITTEN.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(EVENTS_PUBLISHED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(LISTENERS_CONNECTED.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Count a record write by kind.
pub fn record_write(kind: &str) {
    RECORDS_WRITTEN.with_label_values(&[kind]).inc();
}
