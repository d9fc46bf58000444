//! Database models mapping to the catalog schema.

use serde_json::{Map, Value};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Site (tenant/project scope) record.
#[derive(Debug, Clone, FromRow)]
pub struct SiteRow {
    pub id: i64,
    pub name: String,
    pub active: bool,
    pub created_at: OffsetDateTime,
}

/// Logical table record binding a display name to a physical table.
#[derive(Debug, Clone, FromRow)]
pub struct TableRow {
    pub id: i64,
    pub site_id: i64,
    /// Display label; free text and mutable.
    pub table_name: String,
    /// Physical table name; immutable once created.
    pub table_id: String,
    pub created_at: OffsetDateTime,
}

/// A row of a site table keyed by column name.
pub type Record = Map<String, Value>;
