//! Identifier codes and phone numbers.

use crate::error::{EtlResult, RowValidationError};
use crate::types::{DataSet, DataType, Field, Value};

use super::{DropLog, normalize_column};

/// Canonical form of a code column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeFormat {
    /// Digits only. Separators (`?`, spaces, `-`) are removed; any letter rejects the value.
    Digits,
    /// Trimmed and upper-cased.
    Upper,
    /// Trimmed and lower-cased.
    Lower,
}

impl CodeFormat {
    pub fn apply(self, raw: &str) -> Result<String, String> {
        let trimmed = raw.trim();
        let out = match self {
            CodeFormat::Digits => {
                if trimmed.chars().any(char::is_alphabetic) {
                    return Err("code contains letters".to_string());
                }
                trimmed.chars().filter(char::is_ascii_digit).collect()
            }
            CodeFormat::Upper => trimmed.to_uppercase(),
            CodeFormat::Lower => trimmed.to_lowercase(),
        };
        if out.is_empty() {
            return Err("empty code".to_string());
        }
        Ok(out)
    }
}

/// Rewrite `column` in `format`, dropping rows that cannot be formatted.
pub fn format_codes(
    mut ds: DataSet,
    column: &str,
    format: CodeFormat,
    log: &mut DropLog,
) -> EtlResult<DataSet> {
    let step = format!("code:{column}");
    ds = normalize_column(ds, column, &step, log, |v| {
        let text = v.to_text().ok_or_else(|| "missing code".to_string())?;
        format.apply(&text).map(Value::Utf8)
    })?;
    Ok(ds)
}

/// Minimum digits in a usable phone number.
const MIN_PHONE_DIGITS: usize = 7;

/// Split `raw` into a normalized number and an optional extension.
///
/// `(0)` trunk markers are removed, `x`/`ext` introduces the extension, only digits and a
/// leading `+` are kept, and an international `00` prefix becomes `+`.
pub fn normalize_phone(raw: &str) -> Result<(String, Option<String>), String> {
    let lowered = raw.trim().to_lowercase().replace("(0)", "");
    let (number, ext) = match lowered.split_once('x') {
        Some((number, ext)) => (number.to_string(), Some(ext)),
        None => (lowered.clone(), None),
    };

    let plus = number.trim_start().starts_with('+');
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    let normalized = match (plus, digits.strip_prefix("00")) {
        (true, _) => format!("+{digits}"),
        (false, Some(rest)) => format!("+{rest}"),
        (false, None) => digits.clone(),
    };
    if normalized.chars().filter(char::is_ascii_digit).count() < MIN_PHONE_DIGITS {
        return Err(format!("too few digits in phone number '{raw}'"));
    }

    let ext = ext
        .map(|e| e.chars().filter(char::is_ascii_digit).collect::<String>())
        .filter(|e| !e.is_empty());
    Ok((normalized, ext))
}

/// Normalize `column` and move extensions into a new nullable `ext_column`.
pub fn normalize_phone_numbers(
    mut ds: DataSet,
    column: &str,
    ext_column: &str,
    log: &mut DropLog,
) -> EtlResult<DataSet> {
    let idx = ds.column_index(column)?;
    let mut rejected = Vec::new();
    let mut kept = Vec::with_capacity(ds.rows.len());
    let mut exts = Vec::with_capacity(ds.rows.len());
    for (pos, mut row) in std::mem::take(&mut ds.rows).into_iter().enumerate() {
        let raw = row[idx].to_text().unwrap_or_default();
        match normalize_phone(&raw) {
            Ok((number, ext)) => {
                row[idx] = Value::Utf8(number);
                exts.push(ext.map(Value::Utf8).unwrap_or(Value::Null));
                kept.push(row);
            }
            Err(reason) => rejected.push(RowValidationError {
                row: pos,
                column: column.to_string(),
                raw,
                reason,
            }),
        }
    }
    ds.rows = kept;
    log.record(&format!("phone:{column}"), rejected);
    ds.push_column(Field::new(ext_column, DataType::Utf8), exts)?;
    Ok(ds)
}

/// Drop rows where `column` repeats the header name (a page break in a paged export).
pub fn drop_repeated_headers(
    mut ds: DataSet,
    column: &str,
    log: &mut DropLog,
) -> EtlResult<DataSet> {
    let idx = ds.column_index(column)?;
    let removed = ds.retain_rows(|_, row| row[idx].as_str().map(str::trim) != Some(column));
    log.record_count("repeated_header", removed);
    Ok(ds)
}
