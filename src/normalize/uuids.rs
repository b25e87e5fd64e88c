//! UUID validation.

use uuid::Uuid;

use crate::error::EtlResult;
use crate::types::{DataSet, DataType, Value};

use super::{DropLog, normalize_column};

/// Canonical (lower-case, hyphenated) form of `raw`, if it is a UUID.
pub fn canonical_uuid(raw: &str) -> Option<String> {
    Uuid::parse_str(raw.trim()).ok().map(|u| u.hyphenated().to_string())
}

/// Rewrite `column` in canonical UUID form; rows without a valid UUID are dropped.
pub fn validate_uuids(mut ds: DataSet, column: &str, log: &mut DropLog) -> EtlResult<DataSet> {
    let step = format!("uuid:{column}");
    ds = normalize_column(ds, column, &step, log, |v| {
        v.as_str()
            .and_then(canonical_uuid)
            .map(Value::Utf8)
            .ok_or_else(|| "not a uuid".to_string())
    })?;
    let idx = ds.column_index(column)?;
    ds.set_field(idx, DataType::Uuid, false);
    Ok(ds)
}
