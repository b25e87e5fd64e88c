//! Core data model: [`DataSet`], its [`Schema`], and loosely typed cell [`Value`]s.
//!
//! Readers produce datasets whose fields are [`DataType::Any`]; cleaners narrow each
//! column to the semantic type of its warehouse table.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};

use crate::error::{EtlError, EtlResult};

/// Semantic type of a schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// Not yet validated; cells may hold any [`Value`] variant.
    Any,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// Unbounded UTF-8 text.
    Utf8,
    /// UTF-8 text of at most the given number of characters.
    VarChar(usize),
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Canonical hyphenated lower-case UUID text.
    Uuid,
    /// Text restricted to a fixed set of labels.
    Category(Vec<String>),
}

impl DataType {
    /// Build a [`DataType::Category`] from static labels.
    pub fn category(labels: &[&str]) -> Self {
        DataType::Category(labels.iter().map(|s| (*s).to_string()).collect())
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
    /// Whether [`Value::Null`] is allowed in this column.
    pub nullable: bool,
}

impl Field {
    /// Create a nullable field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Create a field that must never hold [`Value::Null`].
    pub fn required(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            nullable: false,
            ..Self::new(name, data_type)
        }
    }
}

/// A list of fields describing the shape of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Which kind of reader produced a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Relational,
    Pdf,
    RestApi,
    ObjectStore,
    Json,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Relational => "relational",
            SourceKind::Pdf => "pdf",
            SourceKind::RestApi => "rest-api",
            SourceKind::ObjectStore => "object-store",
            SourceKind::Json => "json",
        };
        f.write_str(s)
    }
}

/// A single cell in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value.
    Null,
    Int64(i64),
    Float64(f64),
    Bool(bool),
    Utf8(String),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl Value {
    /// Shorthand for `Value::Utf8(s.into())`.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Utf8(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text of a [`Value::Utf8`] cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Render the cell as text. Numbers use their shortest form, dates ISO-8601.
    ///
    /// Returns `None` for [`Value::Null`].
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Utf8(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Key used for equality-based dedup; distinguishes variants.
    pub(crate) fn dedup_key(&self) -> String {
        match self {
            Value::Null => "\u{0}null".to_string(),
            Value::Int64(v) => format!("i:{v}"),
            Value::Float64(v) => format!("f:{v}"),
            Value::Bool(v) => format!("b:{v}"),
            Value::Utf8(s) => format!("s:{s}"),
            Value::Date(d) => format!("d:{d}"),
            Value::Time(t) => format!("t:{t}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str(""),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Utf8(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
        }
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
    /// Reader that produced the dataset, if known.
    pub source: Option<SourceKind>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self {
            schema,
            rows,
            source: None,
        }
    }

    /// Create an untyped dataset from column names; every field is [`DataType::Any`].
    pub fn from_columns<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        let fields = columns
            .into_iter()
            .map(|name| Field::new(name, DataType::Any))
            .collect();
        Self::new(Schema::new(fields), rows)
    }

    /// Tag the dataset with the reader that produced it.
    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.source = Some(source);
        self
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.schema.field_names().map(str::to_string).collect()
    }

    /// Index of `name`, or a [`EtlError::SchemaMismatch`] listing the available columns.
    pub fn column_index(&self, name: &str) -> EtlResult<usize> {
        self.schema
            .index_of(name)
            .ok_or_else(|| EtlError::missing_column(name, &self.column_names()))
    }

    /// Cell at `row` in column `name`.
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.schema.index_of(name)?;
        self.rows.get(row)?.get(idx)
    }

    /// All cells of column `name`, top to bottom.
    pub fn column_values(&self, name: &str) -> EtlResult<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().filter_map(|r| r.get(idx)).collect())
    }

    /// Keep rows for which `keep` returns `true`; returns how many rows were removed.
    ///
    /// `keep` also receives the row's position before removal.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(usize, &[Value]) -> bool,
    {
        let before = self.rows.len();
        let mut pos = 0usize;
        self.rows.retain(|row| {
            let k = keep(pos, row.as_slice());
            pos += 1;
            k
        });
        before - self.rows.len()
    }

    /// Replace every cell of column `idx` with `f(cell)`.
    pub fn update_column<F>(&mut self, idx: usize, mut f: F)
    where
        F: FnMut(&Value) -> Value,
    {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(idx) {
                *cell = f(cell);
            }
        }
    }

    /// Set the declared type (and nullability) of column `idx`.
    pub fn set_field(&mut self, idx: usize, data_type: DataType, nullable: bool) {
        if let Some(field) = self.schema.fields.get_mut(idx) {
            field.data_type = data_type;
            field.nullable = nullable;
        }
    }

    /// Append a column. `values` must have one entry per row.
    pub fn push_column(&mut self, field: Field, values: Vec<Value>) -> EtlResult<()> {
        if values.len() != self.rows.len() {
            return Err(EtlError::SchemaMismatch {
                message: format!(
                    "column '{}' has {} values for {} rows",
                    field.name,
                    values.len(),
                    self.rows.len()
                ),
            });
        }
        if self.schema.index_of(&field.name).is_some() {
            return Err(EtlError::SchemaMismatch {
                message: format!("column '{}' already exists", field.name),
            });
        }
        self.schema.fields.push(field);
        for (row, v) in self.rows.iter_mut().zip(values) {
            row.push(v);
        }
        Ok(())
    }

    /// Remove the named columns. Names that are not present are ignored.
    pub fn drop_columns(&mut self, names: &[&str]) {
        let mut idxs: Vec<usize> = names.iter().filter_map(|n| self.schema.index_of(n)).collect();
        idxs.sort_unstable();
        idxs.dedup();
        for idx in idxs.into_iter().rev() {
            self.schema.fields.remove(idx);
            for row in &mut self.rows {
                if idx < row.len() {
                    row.remove(idx);
                }
            }
        }
    }

    /// Rename column `from` to `to`.
    pub fn rename_column(&mut self, from: &str, to: &str) -> EtlResult<()> {
        let idx = self.column_index(from)?;
        if let Some(field) = self.schema.fields.get_mut(idx) {
            field.name = to.to_string();
        }
        Ok(())
    }

    /// Append all rows of `other`, which must have the same column names.
    pub fn append(&mut self, other: DataSet) -> EtlResult<()> {
        if self.column_names() != other.column_names() {
            return Err(EtlError::SchemaMismatch {
                message: format!(
                    "cannot append dataset with columns {:?} to {:?}",
                    other.column_names(),
                    self.column_names()
                ),
            });
        }
        self.rows.extend(other.rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DataSet, DataType, Field, Value};

    fn sample_dataset() -> DataSet {
        DataSet::from_columns(
            ["id", "name", "code"],
            vec![
                vec![Value::Int64(1), Value::text("a"), Value::text("X1")],
                vec![Value::Int64(2), Value::text("b"), Value::Null],
                vec![Value::Int64(3), Value::text("c"), Value::text("X3")],
            ],
        )
    }

    #[test]
    fn from_columns_builds_untyped_nullable_fields() {
        let ds = sample_dataset();
        assert_eq!(ds.column_names(), vec!["id", "name", "code"]);
        assert!(ds.schema.fields.iter().all(|f| f.data_type == DataType::Any && f.nullable));
    }

    #[test]
    fn retain_rows_reports_removed_count() {
        let mut ds = sample_dataset();
        let removed = ds.retain_rows(|_, row| !row[2].is_null());
        assert_eq!(removed, 1);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.get(1, "name"), Some(&Value::text("c")));
    }

    #[test]
    fn drop_and_rename_columns() {
        let mut ds = sample_dataset();
        ds.drop_columns(&["name", "missing"]);
        ds.rename_column("code", "store_code").unwrap();
        assert_eq!(ds.column_names(), vec!["id", "store_code"]);
        assert_eq!(ds.rows[0], vec![Value::Int64(1), Value::text("X1")]);
    }

    #[test]
    fn push_column_rejects_length_mismatch() {
        let mut ds = sample_dataset();
        let err = ds
            .push_column(Field::new("extra", DataType::Utf8), vec![Value::Null])
            .unwrap_err();
        assert!(err.to_string().contains("has 1 values for 3 rows"));
    }

    #[test]
    fn column_index_lists_available_columns() {
        let ds = sample_dataset();
        let msg = ds.column_index("weight").unwrap_err().to_string();
        assert!(msg.contains("missing required column 'weight'"));
        assert!(msg.contains("\"name\""));
    }

    #[test]
    fn value_display_uses_iso_dates() {
        let d = chrono::NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        assert_eq!(Value::Date(d).to_string(), "2020-01-31");
        assert_eq!(Value::Null.to_text(), None);
        assert_eq!(Value::Float64(0.5).to_text().as_deref(), Some("0.5"));
    }
}
