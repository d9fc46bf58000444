//! SQL text helpers shared by the SQLite and PostgreSQL stores.
//!
//! Identifiers are always double-quoted (both backends accept ANSI quoting),
//! and values are always bound as parameters. Type names only ever come from
//! [`SqlType`](tabula_core::SqlType) or from backend introspection.

use crate::error::{CatalogError, CatalogResult};
use crate::models::Record;
use serde_json::Value;
use tabula_core::{CellValue, ID_COLUMN, NormalizedColumn, PhysicalColumn};

/// Longest identifier accepted for a physical table (PostgreSQL's limit).
const MAX_IDENTIFIER_LEN: usize = 63;

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Reject identifiers that cannot be addressed safely on every backend.
pub fn validate_identifier(name: &str) -> CatalogResult<()> {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_LEN || name.contains('\0') {
        return Err(tabula_core::Error::InvalidTableName(name.to_string()).into());
    }
    Ok(())
}

/// Render `"name" TYPE [NOT NULL]` for a normalized column.
pub fn column_definition(column: &NormalizedColumn) -> String {
    let mut def = format!("{} {}", quote_ident(&column.name), column.sql_type);
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    def
}

/// Render the `CREATE TABLE` statement for a new site table.
///
/// `id_definition` is the backend's spelling of an auto-generated integer
/// primary key.
pub fn create_table_sql(
    table_id: &str,
    id_definition: &str,
    columns: &[NormalizedColumn],
) -> String {
    let mut ddl = format!(
        "CREATE TABLE {} ({} {}",
        quote_ident(table_id),
        quote_ident(ID_COLUMN),
        id_definition
    );
    for column in columns {
        ddl.push_str(", ");
        ddl.push_str(&column_definition(column));
    }
    ddl.push(')');
    ddl
}

/// Filter physical tables down to those no site tracks and that are not reserved.
pub fn untracked_tables(
    physical: Vec<String>,
    tracked: &[String],
    case_insensitive: bool,
) -> Vec<String> {
    physical
        .into_iter()
        .filter(|name| !tabula_core::is_reserved_table(name))
        .filter(|name| {
            !tracked.iter().any(|t| {
                if case_insensitive {
                    t.eq_ignore_ascii_case(name)
                } else {
                    t == name
                }
            })
        })
        .collect()
}

/// Map a unique-constraint violation onto `AlreadyExists`.
pub fn map_unique_violation(err: sqlx::Error, what: impl FnOnce() -> String) -> CatalogError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            CatalogError::AlreadyExists(what())
        }
        _ => CatalogError::Database(err),
    }
}

/// Check that an introspected type name is safe to splice back into DDL.
pub fn checked_reported_type(sql_type: &str) -> CatalogResult<&str> {
    let ok = sql_type
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '(' | ')' | ',' | '_'));
    if ok {
        Ok(sql_type)
    } else {
        Err(CatalogError::Internal(format!(
            "unsupported column type '{sql_type}'"
        )))
    }
}

/// A record field resolved against the live table.
#[derive(Debug, Clone)]
pub struct BoundField {
    /// Column name with the table's own spelling.
    pub field: String,
    /// Introspected type, used for explicit casts on PostgreSQL.
    pub sql_type: String,
    pub value: CellValue,
}

/// Resolve record input against the live columns.
///
/// `id` is always dropped and every other field must name an existing
/// column (case-insensitively). Unknown fields are a validation error.
pub fn bind_fields(columns: &[PhysicalColumn], input: &Record) -> CatalogResult<Vec<BoundField>> {
    let mut bound = Vec::with_capacity(input.len());
    for (key, value) in input {
        if key.eq_ignore_ascii_case(ID_COLUMN) {
            continue;
        }
        let column = columns
            .iter()
            .find(|c| c.field.eq_ignore_ascii_case(key))
            .ok_or_else(|| {
                CatalogError::from(tabula_core::Error::InvalidValue {
                    field: key.clone(),
                    reason: "no such column".to_string(),
                })
            })?;
        bound.push(BoundField {
            field: column.field.clone(),
            sql_type: column.sql_type.clone(),
            value: CellValue::from_json(key, value)?,
        });
    }
    Ok(bound)
}

/// Convert a float into JSON, mapping non-finite values to null.
pub fn float_value(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
