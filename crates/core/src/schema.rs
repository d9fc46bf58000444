//! Schema diff between a desired column set and a live physical table.

use crate::ID_COLUMN;
use crate::column::{NormalizedColumn, SqlType};
use serde::Serialize;
use std::fmt;

/// A column as reported by backend introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalColumn {
    pub field: String,
    pub sql_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

impl PhysicalColumn {
    fn is_id(&self) -> bool {
        self.field.eq_ignore_ascii_case(ID_COLUMN)
    }
}

/// A single schema-altering operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum SchemaOp {
    Add { column: NormalizedColumn },
    Modify { column: NormalizedColumn },
    Drop { field: String },
}

impl SchemaOp {
    /// Short label used in metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Modify { .. } => "modify",
            Self::Drop { .. } => "drop",
        }
    }

    /// The physical column this operation targets.
    pub fn field(&self) -> &str {
        match self {
            Self::Add { column } | Self::Modify { column } => &column.name,
            Self::Drop { field } => field,
        }
    }
}

impl fmt::Display for SchemaOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nullability = |column: &NormalizedColumn| {
            if column.nullable { "NULL" } else { "NOT NULL" }
        };
        match self {
            Self::Add { column } => write!(
                f,
                "ADD {} {} {}",
                column.name,
                column.sql_type,
                nullability(column)
            ),
            Self::Modify { column } => write!(
                f,
                "MODIFY {} {} {}",
                column.name,
                column.sql_type,
                nullability(column)
            ),
            Self::Drop { field } => write!(f, "DROP {field}"),
        }
    }
}

/// Compute the ordered operations that turn `existing` into `desired`.
///
/// Columns are matched by name case-insensitively and `id` is excluded on
/// both sides. Adds and modifies come first, in the caller's order, followed
/// by drops in the table's column order. A modify keeps the live column's
/// spelling so that it addresses the existing column exactly.
pub fn diff_schema(desired: &[NormalizedColumn], existing: &[PhysicalColumn]) -> Vec<SchemaOp> {
    let existing: Vec<&PhysicalColumn> = existing.iter().filter(|c| !c.is_id()).collect();
    let mut ops = Vec::new();

    for column in desired {
        if column.name.eq_ignore_ascii_case(ID_COLUMN) {
            continue;
        }

        let live = existing
            .iter()
            .find(|c| c.field.to_lowercase() == column.name.to_lowercase());

        match live {
            None => ops.push(SchemaOp::Add {
                column: column.clone(),
            }),
            Some(live) => {
                let live_type = SqlType::parse_reported(&live.sql_type);
                if live_type != column.sql_type || live.nullable != column.nullable {
                    ops.push(SchemaOp::Modify {
                        column: NormalizedColumn {
                            name: live.field.clone(),
                            ..column.clone()
                        },
                    });
                }
            }
        }
    }

    for live in existing {
        let wanted = desired
            .iter()
            .any(|c| c.name.to_lowercase() == live.field.to_lowercase());
        if !wanted {
            ops.push(SchemaOp::Drop {
                field: live.field.clone(),
            });
        }
    }

    ops
}
