//! Structured JSON extraction.
//!
//! Supported payloads:
//! - An array of objects: `[{"a":1}, {"a":2}]`
//! - A single object with scalar fields (one row)
//! - A column-oriented object: `{"a": {"0": 1, "1": 2}, "b": {"0": "x", "1": "y"}}`
//!
//! Nested objects are flattened into dot-separated column names (e.g. `address.city`).

use serde_json::Map;

use crate::error::{EtlError, EtlResult};
use crate::types::{DataSet, SourceKind, Value};

use super::http::HttpClient;

/// Fetch `url` and parse the body into a [`DataSet`].
pub fn read_json_from_url(url: &str, http: &dyn HttpClient) -> EtlResult<DataSet> {
    let response = http.get(url, &[])?;
    if !response.is_success() {
        return Err(EtlError::unavailable(
            url,
            format!("GET returned status {}", response.status),
        ));
    }
    let text = String::from_utf8(response.body)
        .map_err(|e| EtlError::format(url, format!("body is not utf-8: {e}")))?;
    read_json_from_str(&text, url)
}

/// Parse an in-memory JSON document into a [`DataSet`].
///
/// `source_name` is used in error messages.
pub fn read_json_from_str(input: &str, source_name: &str) -> EtlResult<DataSet> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(EtlError::format(source_name, "json input is empty"));
    }

    let root: serde_json::Value = serde_json::from_str(trimmed)?;
    let ds = match root {
        serde_json::Value::Array(items) => {
            let mut objects = Vec::with_capacity(items.len());
            for (idx0, item) in items.into_iter().enumerate() {
                match item {
                    serde_json::Value::Object(map) => objects.push(map),
                    _ => {
                        return Err(EtlError::format(
                            source_name,
                            format!("element {idx0} is not a json object"),
                        ));
                    }
                }
            }
            dataset_from_objects(&objects)
        }
        serde_json::Value::Object(map) if is_column_oriented(&map) => dataset_from_columns(&map),
        serde_json::Value::Object(map) => dataset_from_objects(&[map]),
        _ => {
            return Err(EtlError::format(
                source_name,
                "json must be an array of objects or an object",
            ));
        }
    };
    Ok(ds.with_source(SourceKind::Json))
}

/// Build a dataset from JSON objects.
///
/// Columns are the union of flattened keys in first-seen order; keys absent from an
/// object become [`Value::Null`].
pub(crate) fn dataset_from_objects(objects: &[Map<String, serde_json::Value>]) -> DataSet {
    let mut columns: Vec<String> = Vec::new();
    let mut flat_rows: Vec<Vec<(String, Value)>> = Vec::with_capacity(objects.len());

    for obj in objects {
        let mut flat = Vec::new();
        flatten_into("", obj, &mut flat);
        for (name, _) in &flat {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.clone());
            }
        }
        flat_rows.push(flat);
    }

    let rows = flat_rows
        .into_iter()
        .map(|mut flat| {
            columns
                .iter()
                .map(|col| match flat.iter().position(|(name, _)| name == col) {
                    Some(pos) => flat.swap_remove(pos).1,
                    None => Value::Null,
                })
                .collect()
        })
        .collect();

    DataSet::from_columns(columns, rows)
}

fn is_column_oriented(map: &Map<String, serde_json::Value>) -> bool {
    !map.is_empty() && map.values().all(serde_json::Value::is_object)
}

fn dataset_from_columns(map: &Map<String, serde_json::Value>) -> DataSet {
    let mut row_keys: Vec<String> = Vec::new();
    for column in map.values() {
        if let serde_json::Value::Object(cells) = column {
            for key in cells.keys() {
                if !row_keys.contains(key) {
                    row_keys.push(key.clone());
                }
            }
        }
    }

    // Row keys are usually stringified positions ("0", "1", ...); order them numerically.
    if row_keys.iter().all(|k| k.parse::<usize>().is_ok()) {
        row_keys.sort_by_key(|k| k.parse::<usize>().unwrap_or(usize::MAX));
    }

    let columns: Vec<String> = map.keys().cloned().collect();
    let rows = row_keys
        .iter()
        .map(|key| {
            map.values()
                .map(|column| match column.get(key) {
                    Some(v) => convert_json_value(v),
                    None => Value::Null,
                })
                .collect()
        })
        .collect();

    DataSet::from_columns(columns, rows)
}

fn flatten_into(
    prefix: &str,
    obj: &Map<String, serde_json::Value>,
    out: &mut Vec<(String, Value)>,
) {
    for (key, value) in obj {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            serde_json::Value::Object(inner) => flatten_into(&name, inner, out),
            other => out.push((name, convert_json_value(other))),
        }
    }
}

fn convert_json_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else {
                n.as_f64().map(Value::Float64).unwrap_or(Value::Null)
            }
        }
        serde_json::Value::String(s) => Value::Utf8(s.clone()),
        other => Value::Utf8(other.to_string()),
    }
}
