//! Record access on site tables.

use crate::error::CatalogResult;
use crate::models::Record;
use async_trait::async_trait;

/// Repository for rows of physical site tables.
///
/// Writes accept JSON objects; `id` is always ignored and every other key
/// must name a live column.
#[async_trait]
pub trait RecordRepo: Send + Sync {
    /// Read every row of a table.
    async fn list_records(&self, table_id: &str) -> CatalogResult<Vec<Record>>;

    /// Read the `limit` rows with the highest `id`, newest first.
    async fn latest_records(&self, table_id: &str, limit: u32) -> CatalogResult<Vec<Record>>;

    /// Read one row by `id`.
    async fn get_record(&self, table_id: &str, id: i64) -> CatalogResult<Option<Record>>;

    /// Insert a row and return its generated `id`.
    async fn insert_record(&self, table_id: &str, fields: &Record) -> CatalogResult<i64>;

    /// Update a row by `id`; returns the number of rows changed.
    async fn update_record(&self, table_id: &str, id: i64, fields: &Record) -> CatalogResult<u64>;

    /// Delete a row by `id`; returns the number of rows removed.
    async fn delete_record(&self, table_id: &str, id: i64) -> CatalogResult<u64>;
}
