//! Casting cells to declared types and conforming datasets to a target schema.

use crate::error::{EtlResult, RowValidationError};
use crate::types::{DataSet, DataType, Schema, Value};

use super::DropLog;
use super::dates::{parse_date_str, parse_time_str};
use super::uuids::canonical_uuid;

/// Cast a non-null cell to `data_type`.
pub fn coerce_value(value: &Value, data_type: &DataType) -> Result<Value, String> {
    match (data_type, value) {
        (_, Value::Null) => Ok(Value::Null),
        (DataType::Any, v) => Ok(v.clone()),

        (DataType::Int64, Value::Int64(n)) => Ok(Value::Int64(*n)),
        (DataType::Int64, Value::Float64(f)) => whole_float(*f)
            .map(Value::Int64)
            .ok_or_else(|| format!("{f} is not an integer in range")),
        (DataType::Int64, Value::Utf8(s)) => parse_integer(s).map(Value::Int64),

        (DataType::Float64, Value::Float64(f)) if f.is_finite() => Ok(Value::Float64(*f)),
        (DataType::Float64, Value::Int64(n)) => Ok(Value::Float64(*n as f64)),
        (DataType::Float64, Value::Utf8(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::Float64)
            .ok_or_else(|| format!("'{s}' is not a number")),

        (DataType::Bool, Value::Bool(b)) => Ok(Value::Bool(*b)),
        (DataType::Bool, Value::Int64(n @ (0 | 1))) => Ok(Value::Bool(*n == 1)),
        (DataType::Bool, Value::Utf8(s)) => parse_bool(s).map(Value::Bool),

        (DataType::Utf8, v) => Ok(Value::Utf8(v.to_string())),
        (DataType::VarChar(max), v) => {
            let text = v.to_string();
            let len = text.chars().count();
            if len > *max {
                Err(format!("{len} characters exceeds limit of {max}"))
            } else {
                Ok(Value::Utf8(text))
            }
        }

        (DataType::Date, Value::Date(d)) => Ok(Value::Date(*d)),
        (DataType::Date, Value::Utf8(s)) => parse_date_str(s)
            .map(Value::Date)
            .ok_or_else(|| format!("'{s}' is not a date")),

        (DataType::Time, Value::Time(t)) => Ok(Value::Time(*t)),
        (DataType::Time, Value::Utf8(s)) => parse_time_str(s)
            .map(Value::Time)
            .ok_or_else(|| format!("'{s}' is not a time")),

        (DataType::Uuid, Value::Utf8(s)) => canonical_uuid(s)
            .map(Value::Utf8)
            .ok_or_else(|| format!("'{s}' is not a uuid")),

        (DataType::Category(labels), Value::Utf8(s)) if labels.iter().any(|l| l == s) => {
            Ok(Value::Utf8(s.clone()))
        }
        (DataType::Category(_), v) => Err(format!("'{v}' is not an allowed category")),

        (dt, v) => Err(format!("cannot cast {v:?} to {dt:?}")),
    }
}

fn parse_integer(s: &str) -> Result<i64, String> {
    let t = s.trim();
    t.parse::<i64>().or_else(|_| {
        t.parse::<f64>()
            .ok()
            .and_then(whole_float)
            .ok_or_else(|| format!("'{s}' is not an integer"))
    })
}

fn whole_float(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        _ => Err(format!("'{s}' is not a boolean")),
    }
}

/// Reshape `ds` into `target`: select and order its columns, cast every cell, and drop
/// rows that fail a cast or hold a null in a non-nullable column.
///
/// A target column missing from `ds` is a [`crate::error::EtlError::SchemaMismatch`];
/// extra columns are discarded.
pub fn conform(ds: DataSet, target: &Schema, log: &mut DropLog) -> EtlResult<DataSet> {
    let idxs = target
        .fields
        .iter()
        .map(|f| ds.column_index(&f.name))
        .collect::<EtlResult<Vec<_>>>()?;

    let mut rejected = Vec::new();
    let mut rows = Vec::with_capacity(ds.rows.len());
    'rows: for (pos, row) in ds.rows.into_iter().enumerate() {
        let mut out = Vec::with_capacity(idxs.len());
        for (field, &idx) in target.fields.iter().zip(&idxs) {
            let cell = &row[idx];
            let result = if cell.is_null() && !field.nullable {
                Err("null in required column".to_string())
            } else {
                coerce_value(cell, &field.data_type)
            };
            match result {
                Ok(v) => out.push(v),
                Err(reason) => {
                    rejected.push(RowValidationError {
                        row: pos,
                        column: field.name.clone(),
                        raw: cell.to_text().unwrap_or_default(),
                        reason,
                    });
                    continue 'rows;
                }
            }
        }
        rows.push(out);
    }
    log.record("conform", rejected);

    let mut out = DataSet::new(target.clone(), rows);
    out.source = ds.source;
    Ok(out)
}
