//! Record cell values.

use crate::error::{Error, Result};
use serde_json::Value;

/// A value bound into a record write.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    /// Convert a JSON field value.
    ///
    /// Empty strings are stored as NULL. Numbers keep their integer or float
    /// representation; arrays and objects are rejected.
    pub fn from_json(field: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::Float(f))
                } else {
                    Err(Error::InvalidValue {
                        field: field.to_string(),
                        reason: format!("number {n} is out of range"),
                    })
                }
            }
            Value::String(s) if s.is_empty() => Ok(Self::Null),
            Value::String(s) => Ok(Self::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(Error::InvalidValue {
                field: field.to_string(),
                reason: "nested values are not supported".to_string(),
            }),
        }
    }
}
