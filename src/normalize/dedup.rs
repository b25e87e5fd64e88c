//! Duplicate removal.

use std::collections::HashSet;

use crate::error::EtlResult;
use crate::types::DataSet;

use super::DropLog;

/// What makes two rows duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupKey {
    /// Every cell is equal.
    FullRow,
    /// The named columns are equal.
    Columns(Vec<String>),
}

impl DedupKey {
    pub fn columns<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        DedupKey::Columns(names.into_iter().map(Into::into).collect())
    }
}

/// Keep the first row of each duplicate group, preserving row order.
pub fn dedup_rows(mut ds: DataSet, key: &DedupKey, log: &mut DropLog) -> EtlResult<DataSet> {
    let idxs: Vec<usize> = match key {
        DedupKey::FullRow => (0..ds.schema.fields.len()).collect(),
        DedupKey::Columns(names) => names
            .iter()
            .map(|n| ds.column_index(n))
            .collect::<EtlResult<_>>()?,
    };

    let mut seen: HashSet<Vec<String>> = HashSet::with_capacity(ds.rows.len());
    let removed = ds.retain_rows(|_, row| {
        let k: Vec<String> = idxs.iter().map(|&i| row[i].dedup_key()).collect();
        seen.insert(k)
    });

    let step = match key {
        DedupKey::FullRow => "duplicate_rows".to_string(),
        DedupKey::Columns(names) => format!("duplicate_key:{}", names.join(",")),
    };
    log.record_count(&step, removed);
    Ok(ds)
}
