//! Site table operations.
//!
//! Each operation validates and resolves its inputs before issuing any
//! mutating statement, runs the mutation through the catalog and, once it
//! has committed, publishes a change event. Handlers are thin wrappers
//! around these functions.

use crate::error::{ApiError, ApiResult};
use crate::metrics::{
    self, SCHEMA_OPS_APPLIED, SCHEMA_UPDATES_PARTIAL, TABLES_CREATED, TABLES_DELETED,
};
use crate::notifier::ChangeEvent;
use crate::state::AppState;
use bytes::Bytes;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tabula_catalog::{CatalogError, Record, SiteRow, TableRow, apply_schema_ops};
use tabula_core::{
    ColumnSpec, IMAGE_COLUMN, PhysicalColumn, SchemaOp, SiteScope, diff_schema, normalize_columns,
};
use tabula_storage::image::validate_image;

/// Outcome of a schema update.
#[derive(Debug)]
pub struct SchemaUpdate {
    pub table: TableRow,
    pub applied: Vec<SchemaOp>,
    pub renamed: bool,
}

/// Latest rows of one table, as shown on a site dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardEntry {
    #[serde(rename = "tableName")]
    pub table_name: String,
    pub rows: Vec<Record>,
}

// =============================================================================
// Resolution
// =============================================================================

/// Load a site or fail with `NotFound`.
pub async fn require_site(state: &AppState, site_id: i64) -> ApiResult<SiteRow> {
    state
        .catalog
        .get_site(site_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("site {site_id} not found")))
}

fn scope_for(state: &AppState, site_id: i64) -> SiteScope {
    SiteScope::resolve(site_id, state.config.catalog.shared_site_id)
}

/// Resolve a table reference within a site.
pub async fn resolve_table(
    state: &AppState,
    site_id: i64,
    table_ref: &str,
) -> ApiResult<TableRow> {
    require_site(state, site_id).await?;
    state
        .catalog
        .find_table(scope_for(state, site_id), table_ref)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("table '{table_ref}' not found in site {site_id}"))
        })
}

/// Resolve a physical table name without a site filter.
pub async fn tracked_table(state: &AppState, table_id: &str) -> ApiResult<TableRow> {
    state
        .catalog
        .get_table(table_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("table '{table_id}' not found")))
}

fn publish_table_altered(state: &AppState, table: &TableRow) {
    state.notifier.publish(ChangeEvent::TableAltered {
        table_id: table.table_id.clone(),
        site_id: table.site_id,
    });
}

// =============================================================================
// Sites
// =============================================================================

pub async fn list_sites(state: &AppState) -> ApiResult<Vec<SiteRow>> {
    Ok(state.catalog.list_sites().await?)
}

pub async fn create_site(state: &AppState, name: &str) -> ApiResult<SiteRow> {
    let name = name.trim();
    if name.is_empty() {
        return Err(tabula_core::Error::MissingField("name".to_string()).into());
    }

    let site = state.catalog.create_site(name).await?;
    tracing::info!(site_id = site.id, name = %site.name, "Site created");
    state
        .notifier
        .publish(ChangeEvent::SiteAltered { site_id: site.id });
    Ok(site)
}

// =============================================================================
// Tables
// =============================================================================

pub async fn list_tables(state: &AppState, site_id: i64) -> ApiResult<Vec<TableRow>> {
    require_site(state, site_id).await?;
    Ok(state.catalog.list_tables(site_id).await?)
}

/// Provision a new table for a site.
pub async fn create_table(
    state: &AppState,
    site_id: i64,
    display_name: &str,
    columns: &[ColumnSpec],
) -> ApiResult<TableRow> {
    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(tabula_core::Error::MissingField("table_name".to_string()).into());
    }
    let columns = normalize_columns(columns)?;
    require_site(state, site_id).await?;

    let table = state
        .catalog
        .create_table(site_id, display_name, &columns)
        .await?;

    TABLES_CREATED.inc();
    tracing::info!(
        site_id,
        table_id = %table.table_id,
        table_name = %table.table_name,
        columns = columns.len(),
        "Table created"
    );
    state.notifier.publish(ChangeEvent::SiteAltered { site_id });
    Ok(table)
}

/// Bind an existing, untracked physical table to a site.
pub async fn associate_table(
    state: &AppState,
    site_id: i64,
    physical_name: &str,
) -> ApiResult<TableRow> {
    require_site(state, site_id).await?;
    let table = state.catalog.associate_table(site_id, physical_name).await?;

    tracing::info!(site_id, table_id = %table.table_id, "Table associated");
    state.notifier.publish(ChangeEvent::SiteAltered { site_id });
    Ok(table)
}

/// Introspect the live columns of a table.
pub async fn describe_table(
    state: &AppState,
    site_id: i64,
    table_ref: &str,
) -> ApiResult<(TableRow, Vec<PhysicalColumn>)> {
    let table = resolve_table(state, site_id, table_ref).await?;
    let columns = state.catalog.describe_table(&table.table_id).await?;
    Ok((table, columns))
}

/// Bring a table's columns in line with `columns` and optionally rename it.
///
/// The diff runs against live introspection under the table's schema lock.
/// The rename is applied only once every column operation went through. A
/// failed rename after committed column operations still reports them.
pub async fn update_schema(
    state: &AppState,
    site_id: i64,
    table_ref: &str,
    new_name: Option<&str>,
    columns: &[ColumnSpec],
) -> ApiResult<SchemaUpdate> {
    let desired = normalize_columns(columns)?;
    let new_name = new_name.map(str::trim).filter(|name| !name.is_empty());
    let mut table = resolve_table(state, site_id, table_ref).await?;

    let _guard = state.schema_locks.lock(&table.table_id).await;

    let existing = state.catalog.describe_table(&table.table_id).await?;
    let ops = diff_schema(&desired, &existing);

    let applied = match apply_schema_ops(&*state.catalog, &table.table_id, &ops).await {
        Ok(applied) => applied,
        Err(err) => {
            if let CatalogError::PartialFailure { applied, .. } = &err {
                SCHEMA_UPDATES_PARTIAL.inc();
                count_applied(applied);
                publish_table_altered(state, &table);
            }
            return Err(err.into());
        }
    };
    count_applied(&applied);

    let mut renamed = false;
    if let Some(name) = new_name
        && name != table.table_name
    {
        if let Err(err) = state.catalog.rename_table(&table.table_id, name).await {
            if applied.is_empty() {
                return Err(err.into());
            }
            SCHEMA_UPDATES_PARTIAL.inc();
            tracing::warn!(
                table_id = %table.table_id,
                applied = applied.len(),
                error = %err,
                "Rename failed after column changes"
            );
            publish_table_altered(state, &table);
            return Err(ApiError::RenameFailed {
                table_name: name.to_string(),
                applied,
                source: err,
            });
        }
        table.table_name = name.to_string();
        renamed = true;
    }

    if !applied.is_empty() || renamed {
        tracing::info!(
            site_id,
            table_id = %table.table_id,
            applied = applied.len(),
            renamed,
            "Schema updated"
        );
        publish_table_altered(state, &table);
    }

    Ok(SchemaUpdate {
        table,
        applied,
        renamed,
    })
}

fn count_applied(applied: &[SchemaOp]) {
    for op in applied {
        SCHEMA_OPS_APPLIED.with_label_values(&[op.kind()]).inc();
    }
}

/// Remove a table's registry row and drop the physical table.
pub async fn delete_table(state: &AppState, table_id: &str) -> ApiResult<TableRow> {
    let guard = state.schema_locks.lock(table_id).await;
    let deleted = state.catalog.delete_table(table_id).await;
    drop(guard);
    state.schema_locks.forget(table_id);
    let table = deleted?;

    TABLES_DELETED.inc();
    tracing::info!(site_id = table.site_id, table_id = %table.table_id, "Table deleted");
    state.notifier.publish(ChangeEvent::SiteAltered {
        site_id: table.site_id,
    });
    Ok(table)
}

pub async fn list_unassociated(state: &AppState, site_id: i64) -> ApiResult<Vec<String>> {
    require_site(state, site_id).await?;
    Ok(state.catalog.list_unassociated_tables().await?)
}

/// Latest rows from every table of a site.
///
/// A table that cannot be read contributes an empty row list instead of
/// failing the whole dashboard.
pub async fn dashboard(
    state: &AppState,
    site_id: i64,
) -> ApiResult<BTreeMap<String, DashboardEntry>> {
    require_site(state, site_id).await?;
    let tables = state.catalog.list_tables(site_id).await?;
    let limit = state.config.server.dashboard_rows;

    let reads = tables.iter().map(|table| async move {
        match state.catalog.latest_records(&table.table_id, limit).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(
                    site_id,
                    table_id = %table.table_id,
                    error = %e,
                    "Dashboard read failed, returning no rows for table"
                );
                Vec::new()
            }
        }
    });
    let results = join_all(reads).await;

    Ok(tables
        .into_iter()
        .zip(results)
        .map(|(table, rows)| {
            (
                table.table_id,
                DashboardEntry {
                    table_name: table.table_name,
                    rows,
                },
            )
        })
        .collect())
}

// =============================================================================
// Records
// =============================================================================

pub async fn list_records(
    state: &AppState,
    site_id: i64,
    table_ref: &str,
) -> ApiResult<Vec<Record>> {
    let table = resolve_table(state, site_id, table_ref).await?;
    Ok(state.catalog.list_records(&table.table_id).await?)
}

pub async fn create_record(
    state: &AppState,
    site_id: i64,
    table_ref: &str,
    fields: &Record,
) -> ApiResult<i64> {
    let table = resolve_table(state, site_id, table_ref).await?;
    let id = state.catalog.insert_record(&table.table_id, fields).await?;

    metrics::record_write("insert");
    tracing::debug!(table_id = %table.table_id, id, "Record created");
    publish_table_altered(state, &table);
    Ok(id)
}

pub async fn update_record(
    state: &AppState,
    site_id: i64,
    table_ref: &str,
    id: i64,
    fields: &Record,
) -> ApiResult<()> {
    let table = resolve_table(state, site_id, table_ref).await?;
    let updated = state
        .catalog
        .update_record(&table.table_id, id, fields)
        .await?;
    if updated == 0 {
        return Err(record_not_found(&table, id));
    }

    metrics::record_write("update");
    tracing::debug!(table_id = %table.table_id, id, "Record updated");
    publish_table_altered(state, &table);
    Ok(())
}

pub async fn delete_record(state: &AppState, table_id: &str, id: i64) -> ApiResult<()> {
    let table = tracked_table(state, table_id).await?;
    let deleted = state.catalog.delete_record(&table.table_id, id).await?;
    if deleted == 0 {
        return Err(record_not_found(&table, id));
    }

    metrics::record_write("delete");
    tracing::debug!(table_id = %table.table_id, id, "Record deleted");
    publish_table_altered(state, &table);
    Ok(())
}

fn record_not_found(table: &TableRow, id: i64) -> ApiError {
    ApiError::NotFound(format!("record {id} not found in table '{}'", table.table_id))
}

// =============================================================================
// Images
// =============================================================================

/// The blob key stored on a record, if its table has an image column.
///
/// `Err` when the record does not exist, `Ok(None)` when the table has no
/// image column, `Ok(Some(None))` when the column is empty.
async fn record_image(
    state: &AppState,
    table: &TableRow,
    id: i64,
) -> ApiResult<Option<Option<String>>> {
    let record = state
        .catalog
        .get_record(&table.table_id, id)
        .await?
        .ok_or_else(|| record_not_found(table, id))?;

    Ok(record.get(IMAGE_COLUMN).map(|value| match value {
        Value::String(key) if !key.is_empty() => Some(key.clone()),
        _ => None,
    }))
}

fn image_fields(value: Value) -> Record {
    let mut fields = Record::new();
    fields.insert(IMAGE_COLUMN.to_string(), value);
    fields
}

/// Store an image for a record, replacing any previous one.
pub async fn upload_image(
    state: &AppState,
    table_id: &str,
    id: i64,
    file_name: &str,
    content_type: &str,
    data: Bytes,
) -> ApiResult<String> {
    validate_image(content_type, data.len(), state.config.server.max_image_size)?;
    let table = tracked_table(state, table_id).await?;
    let previous = record_image(state, &table, id).await?.ok_or_else(|| {
        ApiError::BadRequest(format!("table '{table_id}' has no image column"))
    })?;

    let key = state.blobs.store(data, file_name).await?;
    let fields = image_fields(Value::String(key.clone()));
    let written = state.catalog.update_record(&table.table_id, id, &fields).await;
    if !matches!(written, Ok(n) if n > 0) {
        if let Err(e) = state.blobs.delete(&key).await {
            tracing::warn!(key = %key, error = %e, "Failed to remove orphaned image");
        }
        return match written {
            Ok(_) => Err(record_not_found(&table, id)),
            Err(e) => Err(e.into()),
        };
    }

    if let Some(previous) = previous
        && let Err(e) = state.blobs.delete(&previous).await
    {
        tracing::warn!(key = %previous, error = %e, "Failed to remove replaced image");
    }

    metrics::record_write("update");
    tracing::info!(table_id = %table.table_id, id, key = %key, "Image stored");
    publish_table_altered(state, &table);
    Ok(key)
}

/// Fetch the image of a record.
pub async fn get_image(state: &AppState, table_id: &str, id: i64) -> ApiResult<(String, Bytes)> {
    let table = tracked_table(state, table_id).await?;
    let key = record_image(state, &table, id)
        .await?
        .flatten()
        .ok_or_else(|| ApiError::NotFound(format!("record {id} has no image")))?;
    let data = state.blobs.retrieve(&key).await?;
    Ok((key, data))
}

/// Remove the image of a record and clear its image column.
pub async fn delete_image(state: &AppState, table_id: &str, id: i64) -> ApiResult<()> {
    let table = tracked_table(state, table_id).await?;
    let key = record_image(state, &table, id)
        .await?
        .flatten()
        .ok_or_else(|| ApiError::NotFound(format!("record {id} has no image")))?;

    state
        .catalog
        .update_record(&table.table_id, id, &image_fields(Value::Null))
        .await?;
    if !state.blobs.delete(&key).await? {
        tracing::warn!(key = %key, "Image blob was already missing");
    }

    metrics::record_write("update");
    tracing::info!(table_id = %table.table_id, id, "Image deleted");
    publish_table_altered(state, &table);
    Ok(())
}
