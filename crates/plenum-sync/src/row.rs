//! Dynamic row decoding.
//!
//! Source rows are read with `SELECT *`, so column types are only known at
//! runtime. Each cell is decoded into a [`FieldValue`] by dispatching on the
//! column's type name; types outside the supported set decode to `Null` with
//! a debug log. The `id` column is handled separately by the synchronizer
//! and never appears in the row map.

use log::debug;
use plenum_core::value::{FieldValue, RowMap};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

/// Decode every column of a row except `id` into a [`RowMap`].
pub fn to_row_map(row: &PgRow) -> RowMap {
    let mut map = RowMap::new();
    for column in row.columns() {
        let name = column.name();
        if name == "id" {
            continue;
        }
        map.insert(name.to_string(), decode_column(row, name, column.type_info().name()));
    }
    map
}

fn decode_column(row: &PgRow, name: &str, type_name: &str) -> FieldValue {
    fn get<'r, T>(row: &'r PgRow, name: &str) -> Option<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get::<Option<T>, _>(name).ok().flatten()
    }

    let value = match type_name {
        "INT2" => get::<i16>(row, name).map(|v| FieldValue::Int(i32::from(v))),
        "INT4" => get::<i32>(row, name).map(FieldValue::Int),
        "INT8" => get::<i64>(row, name).map(FieldValue::BigInt),
        "FLOAT4" => get::<f32>(row, name).map(|v| FieldValue::Float(f64::from(v))),
        "FLOAT8" => get::<f64>(row, name).map(FieldValue::Float),
        "BOOL" => get::<bool>(row, name).map(FieldValue::Bool),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => {
            get::<String>(row, name).map(FieldValue::Text)
        }
        "BYTEA" => get::<Vec<u8>>(row, name).map(FieldValue::Bytes),
        "INT2[]" => get::<Vec<i16>>(row, name)
            .map(|v| FieldValue::IntArray(v.into_iter().map(i64::from).collect())),
        "INT4[]" => get::<Vec<i32>>(row, name)
            .map(|v| FieldValue::IntArray(v.into_iter().map(i64::from).collect())),
        "INT8[]" => get::<Vec<i64>>(row, name).map(FieldValue::IntArray),
        "TEXT[]" | "VARCHAR[]" => get::<Vec<String>>(row, name).map(FieldValue::StringArray),
        "JSON" | "JSONB" => get::<serde_json::Value>(row, name).map(FieldValue::Json),
        "TIMESTAMPTZ" => get::<chrono::DateTime<chrono::Utc>>(row, name)
            .map(|v| FieldValue::Text(v.to_rfc3339())),
        "TIMESTAMP" => {
            get::<chrono::NaiveDateTime>(row, name).map(|v| FieldValue::Text(v.to_string()))
        }
        "DATE" => get::<chrono::NaiveDate>(row, name).map(|v| FieldValue::Text(v.to_string())),
        other => {
            debug!("column {name} has unsupported type {other}, storing null");
            None
        }
    };

    value.unwrap_or(FieldValue::Null)
}
