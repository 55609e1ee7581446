//! Tagged values for dynamically decoded source rows.
//!
//! The synchronizer reads rows with `SELECT *` and does not know column types
//! at compile time, so every cell is decoded into a [`FieldValue`] keyed by
//! its column name. The document projector dispatches on the tag; a tag that
//! does not fit the declared field type drops the field.

use std::collections::BTreeMap;

/// A decoded row: column name to value.
pub type RowMap = BTreeMap<String, FieldValue>;

/// One decoded cell of a source row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 32-bit integer (INT2/INT4 columns).
    Int(i32),
    /// 64-bit integer (INT8 columns).
    BigInt(i64),
    /// Floating point (FLOAT4/FLOAT8 columns).
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Text-like columns.
    Text(String),
    /// Raw bytes (BYTEA columns).
    Bytes(Vec<u8>),
    /// Integer arrays, widened to i64.
    IntArray(Vec<i64>),
    /// Text arrays.
    StringArray(Vec<String>),
    /// JSON/JSONB columns.
    Json(serde_json::Value),
    /// SQL NULL.
    Null,
}

impl FieldValue {
    /// Text content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content widened to i64, if this is an integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(i64::from(*v)),
            FieldValue::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
