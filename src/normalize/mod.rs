//! Field normalizers shared by the dataset cleaners.
//!
//! Every normalizer takes a [`DataSet`] by value, rewrites or drops rows, and returns the
//! result. Rows that cannot be normalized are dropped and recorded in a [`DropLog`]; they
//! never abort the run.
//!
//! ## Example
//!
//! ```rust
//! use retail_etl::normalize::{DropLog, dates::parse_dates, nulls::{NullRule, purge_nulls}};
//! use retail_etl::types::{DataSet, Value};
//!
//! let ds = DataSet::from_columns(
//!     ["join_date"],
//!     vec![
//!         vec![Value::text("2021 March 05")],
//!         vec![Value::text("NULL")],
//!         vec![Value::text("not a date")],
//!     ],
//! );
//! let mut log = DropLog::default();
//! let ds = purge_nulls(ds, &[NullRule::drop_row("join_date")], &mut log).unwrap();
//! let ds = parse_dates(ds, "join_date", &mut log).unwrap();
//! assert_eq!(ds.row_count(), 1);
//! assert_eq!(log.total(), 2);
//! ```

pub mod category;
pub mod codes;
pub mod coerce;
pub mod dates;
pub mod dedup;
pub mod nulls;
pub mod text;
pub mod uuids;
pub mod weight;

use crate::error::{EtlResult, RowValidationError};
use crate::types::{DataSet, Value};

/// Maximum number of rejected rows kept per step for diagnostics.
pub const MAX_SAMPLES: usize = 5;

/// Rows removed by one normalization step.
#[derive(Debug, Clone, PartialEq)]
pub struct DropRecord {
    /// Step name, e.g. `null_purge` or `dates`.
    pub step: String,
    pub rows: usize,
    /// The first [`MAX_SAMPLES`] rejections.
    pub samples: Vec<RowValidationError>,
}

/// Per-step accounting of dropped rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DropLog {
    records: Vec<DropRecord>,
}

impl DropLog {
    /// Record rejected rows for `step`. Steps with no rejections are not recorded.
    pub fn record(&mut self, step: &str, rejected: Vec<RowValidationError>) {
        if rejected.is_empty() {
            return;
        }
        let rows = rejected.len();
        if let Some(first) = rejected.first() {
            tracing::debug!(step, rows, example = %first, "dropped rows");
        }
        let samples = rejected.into_iter().take(MAX_SAMPLES).collect();
        self.push(step, rows, samples);
    }

    /// Record `rows` removed by `step` without per-row detail.
    pub fn record_count(&mut self, step: &str, rows: usize) {
        if rows == 0 {
            return;
        }
        tracing::debug!(step, rows, "dropped rows");
        self.push(step, rows, Vec::new());
    }

    fn push(&mut self, step: &str, rows: usize, samples: Vec<RowValidationError>) {
        match self.records.iter_mut().find(|r| r.step == step) {
            Some(existing) => {
                existing.rows += rows;
                let room = MAX_SAMPLES.saturating_sub(existing.samples.len());
                existing.samples.extend(samples.into_iter().take(room));
            }
            None => self.records.push(DropRecord {
                step: step.to_string(),
                rows,
                samples,
            }),
        }
    }

    pub fn records(&self) -> &[DropRecord] {
        &self.records
    }

    /// Total rows dropped across every step.
    pub fn total(&self) -> usize {
        self.records.iter().map(|r| r.rows).sum()
    }

    /// Rows dropped by `step` (0 if the step dropped nothing).
    pub fn dropped_by(&self, step: &str) -> usize {
        self.records
            .iter()
            .find(|r| r.step == step)
            .map(|r| r.rows)
            .unwrap_or(0)
    }
}

/// Replace each cell of `column` with `f(cell)`, dropping rows where `f` fails.
///
/// Failures are logged under `step` with the returned reason.
pub(crate) fn normalize_column<F>(
    mut ds: DataSet,
    column: &str,
    step: &str,
    log: &mut DropLog,
    mut f: F,
) -> EtlResult<DataSet>
where
    F: FnMut(&Value) -> Result<Value, String>,
{
    let idx = ds.column_index(column)?;
    let mut rejected = Vec::new();
    let mut kept = Vec::with_capacity(ds.rows.len());
    for (pos, mut row) in std::mem::take(&mut ds.rows).into_iter().enumerate() {
        match f(&row[idx]) {
            Ok(v) => {
                row[idx] = v;
                kept.push(row);
            }
            Err(reason) => rejected.push(RowValidationError {
                row: pos,
                column: column.to_string(),
                raw: row[idx].to_text().unwrap_or_default(),
                reason,
            }),
        }
    }
    ds.rows = kept;
    log.record(step, rejected);
    Ok(ds)
}
