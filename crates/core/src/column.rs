//! Column specifications and their normalization into physical columns.
//!
//! User-facing column names are free text and user-facing types follow a small
//! grammar (`WORD` optionally followed by `(digits)`), plus the `IMAGE`
//! pseudo-type. Everything past [`normalize_columns`] only sees
//! [`NormalizedColumn`]s: safe lowercase names and canonical SQL types.

use crate::error::{Error, Result};
use crate::{ID_COLUMN, IMAGE_COLUMN};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Declared size of the reserved image column.
const IMAGE_COLUMN_SIZE: u32 = 255;

/// A column as requested by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, rename = "notNull", alias = "not_null")]
    pub not_null: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, ty: impl Into<String>, not_null: bool) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            not_null,
        }
    }
}

/// A concrete SQL type with its canonical name and optional size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SqlType {
    pub name: String,
    pub size: Option<u32>,
}

impl SqlType {
    pub fn new(name: &str, size: Option<u32>) -> Self {
        let canonical = canonical_type_name(name);
        let (name, size) = match (canonical.as_str(), size) {
            // An unsized CHAR holds exactly one character.
            ("CHAR", None) => ("CHAR".to_string(), Some(1)),
            // FLOAT(p) is a precision in bits, not a size.
            ("FLOAT", None) => ("DOUBLE PRECISION".to_string(), None),
            ("FLOAT", Some(1..=24)) => ("REAL".to_string(), None),
            ("FLOAT", Some(25..=53)) => ("DOUBLE PRECISION".to_string(), None),
            _ => (canonical.clone(), size),
        };
        Self { name, size }
    }

    /// Parse a user-supplied type: ASCII letters, optionally followed by `(digits)`.
    ///
    /// Returns `None` for anything outside that grammar.
    pub fn parse_user(input: &str) -> Option<Self> {
        let input = input.trim();
        let (word, size) = match input.find('(') {
            Some(open) => {
                let inner = input[open + 1..].strip_suffix(')')?;
                if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                (&input[..open], Some(inner.parse::<u32>().ok()?))
            }
            None => (input, None),
        };

        if word.is_empty() || !word.bytes().all(|b| b.is_ascii_alphabetic()) {
            return None;
        }

        Some(Self::new(word, size))
    }

    /// Parse a type as reported by backend introspection.
    ///
    /// Backends report multi-word names (`character varying(100)`,
    /// `timestamp without time zone`) that the user grammar cannot express.
    /// A zero scale is dropped (`numeric(10,0)` is `NUMERIC(10)`). Other sizes
    /// that are not a single integer (e.g. `numeric(10,2)`) are kept as part
    /// of the name so they never compare equal to a user type.
    pub fn parse_reported(input: &str) -> Self {
        let input = input.trim();
        match input.find('(') {
            Some(open) => {
                let inner = input[open + 1..].trim_end_matches(')');
                let precision = match inner.split_once(',') {
                    Some((precision, scale)) if scale.trim() == "0" => precision.trim(),
                    _ => inner.trim(),
                };
                match precision.parse::<u32>() {
                    Ok(size) => Self::new(&input[..open], Some(size)),
                    Err(_) => Self {
                        name: input.to_ascii_uppercase(),
                        size: None,
                    },
                }
            }
            None => Self::new(input, None),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size {
            Some(size) => write!(f, "{}({})", self.name, size),
            None => f.write_str(&self.name),
        }
    }
}

/// Map a type name onto the spelling used for comparison and DDL.
///
/// Collapses synonyms so that a type declared as `INT` and reported back as
/// `integer` or `int4` compare equal.
fn canonical_type_name(name: &str) -> String {
    let upper = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();

    let canonical = match upper.as_str() {
        "INT" | "INTEGER" | "INT4" => "INTEGER",
        "BIGINT" | "INT8" => "BIGINT",
        "SMALLINT" | "INT2" => "SMALLINT",
        "VARCHAR" | "CHARACTER VARYING" => "VARCHAR",
        "CHAR" | "CHARACTER" | "BPCHAR" => "CHAR",
        "BOOL" | "BOOLEAN" => "BOOLEAN",
        "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" => "DOUBLE PRECISION",
        "REAL" | "FLOAT4" => "REAL",
        "DECIMAL" | "NUMERIC" => "NUMERIC",
        "TIMESTAMP" | "TIMESTAMP WITHOUT TIME ZONE" => "TIMESTAMP",
        "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => "TIMESTAMPTZ",
        _ => return upper,
    };
    canonical.to_string()
}

/// A user column type after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Sql(SqlType),
    /// Resolved to the reserved `image_id` column; never reaches DDL as-is.
    ImageRef,
}

impl ColumnType {
    /// Validate a user-supplied type string.
    pub fn parse(column: &str, input: &str) -> Result<Self> {
        if input.trim().eq_ignore_ascii_case("IMAGE") {
            return Ok(Self::ImageRef);
        }
        SqlType::parse_user(input)
            .map(Self::Sql)
            .ok_or_else(|| Error::InvalidColumnType {
                column: column.to_string(),
                ty: input.to_string(),
            })
    }
}

/// A column ready for DDL: safe name, canonical type, nullability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedColumn {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
}

impl NormalizedColumn {
    /// The reserved column that stores image blob keys.
    pub fn image() -> Self {
        Self {
            name: IMAGE_COLUMN.to_string(),
            sql_type: SqlType::new("VARCHAR", Some(IMAGE_COLUMN_SIZE)),
            nullable: true,
        }
    }
}

/// Sanitize a user column name into a physical identifier.
///
/// Lowercases, strips diacritics and collapses whitespace runs into a single
/// underscore.
pub fn normalize_column_name(name: &str) -> String {
    let stripped: String = name
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Normalize a desired column list.
///
/// The `id` column is skipped (it is owned by the engine), every `IMAGE`
/// entry collapses into a single nullable `image_id` column, and the output
/// keeps the caller's order.
pub fn normalize_columns(specs: &[ColumnSpec]) -> Result<Vec<NormalizedColumn>> {
    let mut columns = Vec::with_capacity(specs.len());
    let mut seen = HashSet::new();
    let mut image_emitted = false;

    for spec in specs {
        let name = normalize_column_name(&spec.name);
        if name.is_empty() {
            return Err(Error::InvalidColumnName(format!(
                "column name '{}' is empty after normalization",
                spec.name
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(Error::InvalidColumnName(format!(
                "column name '{}' contains control characters",
                spec.name
            )));
        }
        if name == ID_COLUMN {
            continue;
        }

        let column = match ColumnType::parse(&spec.name, &spec.ty)? {
            ColumnType::ImageRef => {
                if image_emitted {
                    continue;
                }
                image_emitted = true;
                NormalizedColumn::image()
            }
            ColumnType::Sql(sql_type) => NormalizedColumn {
                name,
                sql_type,
                nullable: !spec.not_null,
            },
        };

        if !seen.insert(column.name.clone()) {
            return Err(Error::DuplicateColumn(column.name));
        }
        columns.push(column);
    }

    Ok(columns)
}
