//! Raw JSON records and typed field access

use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A raw fragment record, keys kept in sorted order
pub type Record = Map<String, Value>;

/// Field access error, rendered into a `RecordError` by the caller
pub type FieldResult<T> = std::result::Result<T, String>;

/// Get a required string field
pub fn req_str(record: &Record, key: &str) -> FieldResult<String> {
    match record.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!("field '{}' must be a string, found {}", key, kind(other))),
        None => Err(format!("missing field '{}'", key)),
    }
}

/// Get an optional string field; `null` counts as absent
pub fn opt_str(record: &Record, key: &str) -> FieldResult<Option<String>> {
    match record.get(key) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(format!("field '{}' must be a string, found {}", key, kind(other))),
    }
}

/// Get a required integer field
pub fn req_int(record: &Record, key: &str) -> FieldResult<i64> {
    match record.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| format!("field '{}' must be an integer, found {}", key, n)),
        Some(other) => Err(format!("field '{}' must be an integer, found {}", key, kind(other))),
        None => Err(format!("missing field '{}'", key)),
    }
}

/// Get an optional boolean field, defaulting to false
pub fn opt_bool(record: &Record, key: &str) -> FieldResult<bool> {
    match record.get(key) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Null) | None => Ok(false),
        Some(other) => Err(format!("field '{}' must be a boolean, found {}", key, kind(other))),
    }
}

/// Get a required list of strings as a set
pub fn req_str_set(record: &Record, key: &str) -> FieldResult<BTreeSet<String>> {
    match record.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(format!(
                    "field '{}' must only contain strings, found {}",
                    key,
                    kind(other)
                )),
            })
            .collect(),
        Some(other) => Err(format!("field '{}' must be a list, found {}", key, kind(other))),
        None => Err(format!("missing field '{}'", key)),
    }
}

/// Get a required list of objects
pub fn req_objects<'a>(record: &'a Record, key: &str) -> FieldResult<Vec<&'a Record>> {
    match record.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Object(obj) => Ok(obj),
                other => Err(format!(
                    "field '{}' must only contain objects, found {}",
                    key,
                    kind(other)
                )),
            })
            .collect(),
        Some(other) => Err(format!("field '{}' must be a list, found {}", key, kind(other))),
        None => Err(format!("missing field '{}'", key)),
    }
}

/// Copy every field not in `known` so conversions back to records stay lossless
pub fn extra_fields(record: &Record, known: &[&str]) -> Record {
    record
        .iter()
        .filter(|(k, _)| !known.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Record name for log lines
pub fn display_name(record: &Record) -> &str {
    record
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("unnamed")
}

/// Sort a string set back into a JSON array
pub fn str_set_value(set: &BTreeSet<String>) -> Value {
    Value::Array(set.iter().cloned().map(Value::String).collect())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
