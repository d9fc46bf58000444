//! Core domain types and shared logic for tabula site tables.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Column specifications and their normalization into physical columns
//! - The schema diff between a desired column set and a live table
//! - Opaque physical table identifiers
//! - Site scoping and the reserved table-name policy
//! - Record cell values

pub mod column;
pub mod config;
pub mod error;
pub mod schema;
pub mod scope;
pub mod table_id;
pub mod value;

pub use column::{
    ColumnSpec, ColumnType, NormalizedColumn, SqlType, normalize_column_name, normalize_columns,
};
pub use error::{Error, Result};
pub use schema::{PhysicalColumn, SchemaOp, diff_schema};
pub use scope::{RESERVED_TABLES, SiteScope, is_reserved_table};
pub use table_id::{TABLE_ID_LEN, generate_table_id};
pub use value::CellValue;

/// Name of the engine-owned primary key column present in every site table.
pub const ID_COLUMN: &str = "id";

/// Physical column that holds the blob-store key for the IMAGE pseudo-type.
pub const IMAGE_COLUMN: &str = "image_id";
