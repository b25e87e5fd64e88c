//! Categorical columns.

use crate::error::EtlResult;
use crate::types::{DataSet, DataType, Value};

use super::{DropLog, normalize_column};

/// Allowed labels of a categorical column plus known misspellings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMap {
    allowed: Vec<String>,
    aliases: Vec<(String, String)>,
}

impl CategoryMap {
    pub fn new(allowed: &[&str]) -> Self {
        Self {
            allowed: allowed.iter().map(|s| (*s).to_string()).collect(),
            aliases: Vec::new(),
        }
    }

    /// Map `from` onto the canonical label `to`.
    pub fn alias(mut self, from: &str, to: &str) -> Self {
        self.aliases.push((from.to_string(), to.to_string()));
        self
    }

    /// Canonical label for `raw` (trimmed), if it is allowed or a known alias.
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        let s = raw.trim();
        if let Some(label) = self.allowed.iter().find(|l| *l == s) {
            return Some(label.as_str());
        }
        self.aliases
            .iter()
            .find(|(from, _)| from == s)
            .and_then(|(_, to)| self.allowed.iter().find(|l| *l == to))
            .map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.allowed
    }

    pub fn data_type(&self) -> DataType {
        DataType::Category(self.allowed.clone())
    }
}

/// Replace aliases in `column` with their canonical label and drop rows whose value is
/// not in `map`.
pub fn correct_categories(
    mut ds: DataSet,
    column: &str,
    map: &CategoryMap,
    log: &mut DropLog,
) -> EtlResult<DataSet> {
    let step = format!("category:{column}");
    ds = normalize_column(ds, column, &step, log, |v| {
        v.as_str()
            .and_then(|s| map.resolve(s))
            .map(Value::text)
            .ok_or_else(|| "not an allowed category".to_string())
    })?;
    let idx = ds.column_index(column)?;
    ds.set_field(idx, map.data_type(), false);
    Ok(ds)
}
