//! Projection of one nested record into a rectangular row.

use serde_json::{Map, Value};

/// A flat row: every value is a scalar (string, number, bool or null).
pub type FlatRow = Map<String, Value>;

/// Merge the object under `nested_key` into the parent as `{prefix}{key}` and
/// drop the nested key. Parent keys win on clashes. A nested value that is not
/// an object stays under its own key. Whatever is still an object or array
/// afterwards (e.g. `account_fields`) is stored as its JSON text.
pub fn flatten_record(mut obj: Map<String, Value>, nested_key: &str, prefix: &str) -> FlatRow {
    let nested = obj.remove(nested_key);
    let mut row: FlatRow = obj;

    match nested {
        Some(Value::Object(inner)) => {
            for (k, v) in inner {
                row.entry(format!("{prefix}{k}")).or_insert(v);
            }
        }
        Some(Value::Null) | None => {}
        Some(other) => {
            row.insert(nested_key.to_string(), other);
        }
    }

    for v in row.values_mut() {
        if v.is_object() || v.is_array() {
            *v = Value::String(v.to_string());
        }
    }
    row
}

/// Serialize `record` and flatten it. Non-object serializations yield an empty row.
pub fn flatten_serializable<T: serde::Serialize>(record: &T, nested_key: &str, prefix: &str) -> FlatRow {
    match serde_json::to_value(record) {
        Ok(Value::Object(m)) => flatten_record(m, nested_key, prefix),
        Ok(_) => FlatRow::new(),
        Err(e) => {
            tracing::debug!(error=%e, "record did not serialize; empty row");
            FlatRow::new()
        }
    }
}

/// Scalar cell as text: strings verbatim, numbers/bools via their JSON form.
pub fn cell_string(row: &FlatRow, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
