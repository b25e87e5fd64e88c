//! Relational source extraction.
//!
//! The legacy operational store is reached through [`TableSource`]. The bundled
//! implementation reads a SQLite database file; a connection is opened per source and
//! released when the source is dropped.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use crate::config::Credentials;
use crate::error::{EtlError, EtlResult};
use crate::types::{DataSet, SourceKind, Value};

/// Read access to named tables of a relational database.
pub trait TableSource {
    /// Names of the user tables, sorted.
    fn list_tables(&self) -> EtlResult<Vec<String>>;

    /// Every row and column of `table`, columns in table order.
    ///
    /// A table that does not exist is [`EtlError::SourceUnavailable`].
    fn read_table(&self, table: &str) -> EtlResult<DataSet>;
}

/// [`TableSource`] over a SQLite database.
pub struct SqliteTableSource {
    conn: Connection,
    name: String,
}

impl SqliteTableSource {
    /// Open `path` read-only.
    pub fn open(path: impl AsRef<Path>) -> EtlResult<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| EtlError::unavailable(&name, e))?;
        Ok(Self { conn, name })
    }

    /// Open the database named by the `database` credential.
    pub fn from_credentials(credentials: &Credentials) -> EtlResult<Self> {
        let path = PathBuf::from(credentials.require("database")?);
        Self::open(path)
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            name: "sqlite".to_string(),
        }
    }
}

impl TableSource for SqliteTableSource {
    fn list_tables(&self) -> EtlResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(|e| EtlError::unavailable(&self.name, e))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| EtlError::unavailable(&self.name, e))?;
        Ok(names)
    }

    fn read_table(&self, table: &str) -> EtlResult<DataSet> {
        let quoted = quote_identifier(table)?;
        let exists = self
            .conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1")
            .and_then(|mut stmt| stmt.exists([table]))
            .map_err(|e| EtlError::unavailable(&self.name, e))?;
        if !exists {
            return Err(EtlError::unavailable(
                &self.name,
                format!("table '{table}' does not exist"),
            ));
        }

        let ds = query_dataset(&self.conn, &format!("SELECT * FROM {quoted}"))
            .map_err(|e| EtlError::unavailable(&self.name, e))?;
        tracing::debug!(table, rows = ds.row_count(), "read relational table");
        Ok(ds.with_source(SourceKind::Relational))
    }
}

/// Stand-in used when the relational store cannot be opened; every read fails with the
/// original reason so that only the datasets depending on it fail.
#[derive(Debug, Clone)]
pub struct UnavailableTables {
    pub reason: String,
}

impl TableSource for UnavailableTables {
    fn list_tables(&self) -> EtlResult<Vec<String>> {
        Err(EtlError::unavailable("relational store", &self.reason))
    }

    fn read_table(&self, table: &str) -> EtlResult<DataSet> {
        Err(EtlError::unavailable(
            "relational store",
            format!("cannot read '{table}': {}", self.reason),
        ))
    }
}

/// Run `sql` and collect every row into an untyped dataset.
pub(crate) fn query_dataset(conn: &Connection, sql: &str) -> rusqlite::Result<DataSet> {
    let mut stmt = conn.prepare(sql)?;
    let column_count = stmt.column_count();
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    let mut result_rows = stmt.query([])?;
    while let Some(row) = result_rows.next()? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            let value = match row.get_ref(i)? {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(n) => Value::Int64(n),
                ValueRef::Real(f) => Value::Float64(f),
                ValueRef::Text(t) => Value::Utf8(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Blob(b) => Value::Utf8(String::from_utf8_lossy(b).into_owned()),
            };
            values.push(value);
        }
        rows.push(values);
    }

    Ok(DataSet::from_columns(columns, rows))
}

/// Double-quote a table or column name after checking it is a plain identifier.
pub(crate) fn quote_identifier(name: &str) -> EtlResult<String> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(EtlError::config(format!("'{name}' is not a valid identifier")));
    }
    Ok(format!("\"{name}\""))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::{SqliteTableSource, TableSource, quote_identifier};
    use crate::error::ErrorKind;
    use crate::types::{SourceKind, Value};

    fn legacy_store() -> SqliteTableSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE legacy_users (first_name TEXT, date_of_birth TEXT, score REAL, visits INTEGER);
             INSERT INTO legacy_users VALUES ('Ada', '1990-02-01', 1.5, 3);
             INSERT INTO legacy_users VALUES ('Bob', NULL, NULL, 7);
             CREATE TABLE orders_table (date_uuid TEXT);",
        )
        .unwrap();
        SqliteTableSource::from_connection(conn)
    }

    #[test]
    fn lists_user_tables_sorted() {
        let source = legacy_store();
        assert_eq!(source.list_tables().unwrap(), vec!["legacy_users", "orders_table"]);
    }

    #[test]
    fn reads_every_row_in_table_column_order() {
        let source = legacy_store();
        let ds = source.read_table("legacy_users").unwrap();
        assert_eq!(ds.column_names(), vec!["first_name", "date_of_birth", "score", "visits"]);
        assert_eq!(ds.source, Some(SourceKind::Relational));
        assert_eq!(
            ds.rows[0],
            vec![
                Value::text("Ada"),
                Value::text("1990-02-01"),
                Value::Float64(1.5),
                Value::Int64(3),
            ]
        );
        assert_eq!(ds.get(1, "date_of_birth"), Some(&Value::Null));
    }

    #[test]
    fn missing_table_is_unavailable() {
        let source = legacy_store();
        let err = source.read_table("legacy_cards").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
        assert!(err.to_string().contains("legacy_cards"));
    }

    #[test]
    fn identifiers_are_validated_before_quoting() {
        assert_eq!(quote_identifier("dim_users").unwrap(), "\"dim_users\"");
        assert!(quote_identifier("users; DROP TABLE x").is_err());
        assert!(quote_identifier("1users").is_err());
    }
}
