//! Conversion between engine values and JSON, used by export and import.
//!
//! The conversion is driven by the column's data type:
//! - Boolean: JSON boolean
//! - Int64: JSON integer
//! - Float64: JSON number (NaN and infinities export as null)
//! - String: JSON string
//! - DateTime: JSON integer, Unix timestamp in milliseconds
//! - Bytes: lowercase hex string

use std::fmt::Write;

use serde_json::{Map, Number, Value as Json};
use trellis_core::schema::Table;
use trellis_core::{DataType, Error, Payload, Result, Row, RowId, Value};

/// Converts a JSON value to a `Value` of the expected type.
pub fn json_to_value(json: &Json, expected_type: DataType) -> Result<Value> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    let converted = match expected_type {
        DataType::Boolean => json.as_bool().map(Value::Boolean),
        DataType::Int64 => json.as_i64().map(Value::Int64),
        DataType::Float64 => json.as_f64().map(Value::Float64),
        DataType::String => json.as_str().map(|s| Value::String(s.into())),
        DataType::DateTime => json.as_i64().map(Value::DateTime),
        DataType::Bytes => json.as_str().and_then(decode_hex).map(Value::Bytes),
    };
    converted.ok_or_else(|| Error::import(format!("expected {:?}, found {}", expected_type, json)))
}

pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Int64(n) | Value::DateTime(n) => Json::Number((*n).into()),
        Value::Float64(n) => Number::from_f64(*n).map_or(Json::Null, Json::Number),
        Value::String(s) => Json::String(s.to_string()),
        Value::Bytes(b) => Json::String(encode_hex(b)),
    }
}

/// Converts a row to a JSON object keyed by column name.
pub fn row_to_json(row: &Row) -> Map<String, Json> {
    row.payload()
        .iter()
        .map(|(column, value)| (column.clone(), value_to_json(value)))
        .collect()
}

/// Converts a JSON object to a row of `table`.
///
/// Columns missing from the object are stored as null; keys that are not
/// columns of the table are rejected.
pub fn json_to_row(object: &Map<String, Json>, table: &Table, id: RowId) -> Result<Row> {
    if let Some(unknown) = object.keys().find(|k| table.get_column(k).is_none()) {
        return Err(Error::column_not_found(table.name(), unknown.as_str()));
    }
    let mut payload = Payload::new();
    for column in table.columns() {
        let value = match object.get(column.name()) {
            Some(json) => json_to_value(json, column.data_type())?,
            None => Value::Null,
        };
        payload.insert(column.name().to_string(), value);
    }
    Ok(Row::new(id, payload))
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| s.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}
