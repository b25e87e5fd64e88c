//! Null sentinel purge.
//!
//! Sources spell "missing" in several ways (`NULL`, `N/A`, empty strings). A
//! [`SentinelSet`] recognises them; a [`NullRule`] says what to do when one is found.

use crate::error::{EtlResult, RowValidationError};
use crate::types::{DataSet, Value};

use super::DropLog;

/// Text tokens treated as missing values, compared after trimming.
pub const DEFAULT_NULL_TOKENS: &[&str] = &["NULL", "null", "N/A", "n/a", "NaN", "nan", "None"];

/// Recognises null sentinels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelSet {
    tokens: Vec<String>,
    noise: bool,
}

impl SentinelSet {
    /// [`DEFAULT_NULL_TOKENS`] plus empty and whitespace-only text.
    pub fn standard() -> Self {
        Self::tokens(DEFAULT_NULL_TOKENS)
    }

    pub fn tokens(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| (*t).to_string()).collect(),
            noise: false,
        }
    }

    /// Also treat export noise as null: 10-character upper-case alphanumeric tokens
    /// mixing letters and digits (e.g. `7QB0Z9EW1G`).
    ///
    /// Only enable this for columns whose legitimate values can never look like that.
    pub fn with_noise(mut self) -> Self {
        self.noise = true;
        self
    }

    pub fn is_sentinel(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::Float64(f) => f.is_nan(),
            Value::Utf8(s) => {
                let t = s.trim();
                t.is_empty()
                    || self.tokens.iter().any(|tok| tok == t)
                    || (self.noise && is_noise(t))
            }
            _ => false,
        }
    }
}

fn is_noise(s: &str) -> bool {
    s.len() == 10
        && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && s.chars().any(|c| c.is_ascii_digit())
        && s.chars().any(|c| c.is_ascii_uppercase())
}

/// What to do with a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    /// Remove the whole row.
    DropRow,
    /// Replace the cell with [`Value::Null`].
    SetNull,
}

/// Sentinel handling for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullRule {
    pub column: String,
    pub sentinels: SentinelSet,
    pub policy: NullPolicy,
}

impl NullRule {
    pub fn drop_row(column: &str) -> Self {
        Self {
            column: column.to_string(),
            sentinels: SentinelSet::standard(),
            policy: NullPolicy::DropRow,
        }
    }

    pub fn set_null(column: &str) -> Self {
        Self {
            policy: NullPolicy::SetNull,
            ..Self::drop_row(column)
        }
    }

    pub fn with_noise(mut self) -> Self {
        self.sentinels = self.sentinels.with_noise();
        self
    }
}

/// Apply `rules` to every row.
///
/// A row is dropped if any `DropRow` rule matches; `SetNull` rules rewrite their cell.
/// Cells that are not sentinels are never modified.
pub fn purge_nulls(mut ds: DataSet, rules: &[NullRule], log: &mut DropLog) -> EtlResult<DataSet> {
    let resolved = rules
        .iter()
        .map(|r| ds.column_index(&r.column).map(|idx| (idx, r)))
        .collect::<EtlResult<Vec<_>>>()?;

    let mut rejected = Vec::new();
    let mut kept = Vec::with_capacity(ds.rows.len());
    'rows: for (pos, mut row) in std::mem::take(&mut ds.rows).into_iter().enumerate() {
        for (idx, rule) in &resolved {
            if !rule.sentinels.is_sentinel(&row[*idx]) {
                continue;
            }
            match rule.policy {
                NullPolicy::DropRow => {
                    rejected.push(RowValidationError {
                        row: pos,
                        column: rule.column.clone(),
                        raw: row[*idx].to_text().unwrap_or_default(),
                        reason: "null sentinel in required column".to_string(),
                    });
                    continue 'rows;
                }
                NullPolicy::SetNull => row[*idx] = Value::Null,
            }
        }
        kept.push(row);
    }
    ds.rows = kept;
    log.record("null_purge", rejected);
    Ok(ds)
}
