//! Warehouse loading.
//!
//! [`WarehouseSink::persist`] replaces a table with a cleaned dataset. The bundled
//! [`SqliteWarehouse`] does this inside one transaction: the previous table is dropped,
//! recreated from the dataset's schema and refilled, so a failed write leaves the old
//! contents untouched and a re-run produces the same table.

use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params_from_iter};

use crate::config::Credentials;
use crate::error::{EtlError, EtlResult};
use crate::extraction::rds::{query_dataset, quote_identifier};
use crate::types::{DataSet, DataType, Field, Value};

/// Destination for cleaned datasets.
pub trait WarehouseSink {
    /// Replace the contents of `table` with `dataset`; returns the number of rows written.
    ///
    /// Column order and declared types of the dataset become the table schema.
    fn persist(&mut self, dataset: DataSet, table: &str) -> EtlResult<usize>;
}

/// [`WarehouseSink`] writing to a SQLite database.
pub struct SqliteWarehouse {
    conn: Connection,
}

impl SqliteWarehouse {
    pub fn open(path: impl AsRef<Path>) -> EtlResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            EtlError::sink(path.display().to_string(), format!("cannot open warehouse: {e}"))
        })?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> EtlResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EtlError::sink(":memory:", format!("cannot open warehouse: {e}")))?;
        Ok(Self { conn })
    }

    /// Open the database named by the `database` credential.
    pub fn from_credentials(credentials: &Credentials) -> EtlResult<Self> {
        Self::open(credentials.require("database")?)
    }

    /// Read a table back (dates and times come back as text).
    pub fn fetch_table(&self, table: &str) -> EtlResult<DataSet> {
        let quoted = quote_identifier(table)?;
        query_dataset(&self.conn, &format!("SELECT * FROM {quoted}"))
            .map_err(|e| EtlError::sink(table, e))
    }
}

impl WarehouseSink for SqliteWarehouse {
    fn persist(&mut self, dataset: DataSet, table: &str) -> EtlResult<usize> {
        let quoted = quote_identifier(table)?;
        let columns = dataset
            .schema
            .fields
            .iter()
            .map(column_definition)
            .collect::<EtlResult<Vec<_>>>()?;
        if columns.is_empty() {
            return Err(EtlError::sink(table, "dataset has no columns"));
        }
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.transaction().map_err(|e| EtlError::sink(table, e))?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {quoted}; CREATE TABLE {quoted} ({});",
            columns.join(", ")
        ))
        .map_err(|e| EtlError::sink(table, e))?;

        let mut written = 0usize;
        {
            let mut stmt = tx
                .prepare(&format!("INSERT INTO {quoted} VALUES ({placeholders})"))
                .map_err(|e| EtlError::sink(table, e))?;
            for row in &dataset.rows {
                stmt.execute(params_from_iter(row.iter().map(sql_value)))
                    .map_err(|e| EtlError::sink(table, format!("row {written}: {e}")))?;
                written += 1;
            }
        }
        tx.commit().map_err(|e| EtlError::sink(table, e))?;

        tracing::info!(table, rows = written, "persisted table");
        Ok(written)
    }
}

fn column_definition(field: &Field) -> EtlResult<String> {
    let name = quote_identifier(&field.name)?;
    let null = if field.nullable { "" } else { " NOT NULL" };
    Ok(format!("{name} {}{null}", sql_type(&field.data_type)))
}

/// SQL column type for a declared data type.
pub fn sql_type(data_type: &DataType) -> String {
    match data_type {
        DataType::Any | DataType::Utf8 => "TEXT".to_string(),
        DataType::Int64 => "BIGINT".to_string(),
        DataType::Float64 => "DOUBLE PRECISION".to_string(),
        DataType::Bool => "BOOLEAN".to_string(),
        DataType::VarChar(n) => format!("VARCHAR({n})"),
        DataType::Date => "DATE".to_string(),
        DataType::Time => "TIME".to_string(),
        DataType::Uuid => "UUID".to_string(),
        DataType::Category(labels) => {
            let width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(1);
            format!("VARCHAR({width})")
        }
    }
}

fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Int64(n) => SqlValue::Integer(*n),
        Value::Float64(f) => SqlValue::Real(*f),
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Utf8(s) => SqlValue::Text(s.clone()),
        Value::Date(_) | Value::Time(_) => SqlValue::Text(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{SqliteWarehouse, WarehouseSink, sql_type};
    use crate::error::ErrorKind;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn cleaned_stores(codes: &[&str]) -> DataSet {
        let schema = Schema::new(vec![
            Field::required("store_code", DataType::VarChar(12)),
            Field::new("staff_numbers", DataType::Int64),
            Field::required("opening_date", DataType::Date),
        ]);
        let opened = NaiveDate::from_ymd_opt(2010, 6, 12).unwrap();
        let rows = codes
            .iter()
            .enumerate()
            .map(|(i, c)| vec![Value::text(*c), Value::Int64(i as i64), Value::Date(opened)])
            .collect();
        DataSet::new(schema, rows)
    }

    #[test]
    fn persist_twice_leaves_identical_table() {
        let mut wh = SqliteWarehouse::open_in_memory().unwrap();
        let ds = cleaned_stores(&["WEB-1388012W", "HI-9B97EE4E"]);

        assert_eq!(wh.persist(ds.clone(), "dim_store_details").unwrap(), 2);
        let first = wh.fetch_table("dim_store_details").unwrap();
        assert_eq!(wh.persist(ds, "dim_store_details").unwrap(), 2);
        let second = wh.fetch_table("dim_store_details").unwrap();

        assert_eq!(first, second);
        assert_eq!(second.row_count(), 2);
        assert_eq!(second.get(0, "opening_date"), Some(&Value::text("2010-06-12")));
    }

    #[test]
    fn persist_replaces_previous_contents() {
        let mut wh = SqliteWarehouse::open_in_memory().unwrap();
        wh.persist(cleaned_stores(&["A", "B", "C"]), "dim_store_details").unwrap();
        wh.persist(cleaned_stores(&["D"]), "dim_store_details").unwrap();
        let out = wh.fetch_table("dim_store_details").unwrap();
        assert_eq!(out.row_count(), 1);
        assert_eq!(out.get(0, "store_code"), Some(&Value::text("D")));
    }

    #[test]
    fn rejected_write_keeps_old_table() {
        let mut wh = SqliteWarehouse::open_in_memory().unwrap();
        wh.persist(cleaned_stores(&["A"]), "dim_store_details").unwrap();

        let mut bad = cleaned_stores(&["B"]);
        bad.rows[0][0] = Value::Null;
        let err = wh.persist(bad, "dim_store_details").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SinkWrite);

        let out = wh.fetch_table("dim_store_details").unwrap();
        assert_eq!(out.get(0, "store_code"), Some(&Value::text("A")));
    }

    #[test]
    fn column_types() {
        assert_eq!(sql_type(&DataType::VarChar(17)), "VARCHAR(17)");
        assert_eq!(sql_type(&DataType::category(&["Light", "Truck_Required"])), "VARCHAR(14)");
        assert_eq!(sql_type(&DataType::Float64), "DOUBLE PRECISION");
    }
}
