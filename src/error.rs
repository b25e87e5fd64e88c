use std::fmt;

use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type EtlResult<T> = Result<T, EtlError>;

/// Error type returned by extraction, cleaning, loading and configuration code.
///
/// Row-level problems are not errors: cleaners drop the row and record a
/// [`RowValidationError`] instead.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited-text parse error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON payload could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration could not be parsed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A source could not be reached (connection, auth, network, missing table).
    #[error("source '{source_name}' unavailable: {message}")]
    SourceUnavailable { source_name: String, message: String },

    /// A paginated fetch returned a non-success status.
    #[error("record {index} fetch from '{url}' failed with status {status}")]
    RecordFetch { index: usize, url: String, status: u16 },

    /// A source payload does not have the expected shape.
    #[error("source '{source_name}' format error: {message}")]
    SourceFormat { source_name: String, message: String },

    /// A dataset does not contain a column an operation needs.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// The warehouse rejected a write.
    #[error("failed to write table '{table}': {message}")]
    SinkWrite { table: String, message: String },

    /// Configuration or credentials are missing or invalid.
    #[error("configuration error: {message}")]
    Config { message: String },
}

/// Coarse classification of an [`EtlError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SourceUnavailable,
    SourceFormat,
    SinkWrite,
    Config,
}

impl EtlError {
    /// Map the error onto the pipeline failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EtlError::Io(_) | EtlError::SourceUnavailable { .. } | EtlError::RecordFetch { .. } => {
                ErrorKind::SourceUnavailable
            }
            EtlError::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => ErrorKind::SourceUnavailable,
                _ => ErrorKind::SourceFormat,
            },
            EtlError::Json(_) | EtlError::SourceFormat { .. } | EtlError::SchemaMismatch { .. } => {
                ErrorKind::SourceFormat
            }
            EtlError::SinkWrite { .. } => ErrorKind::SinkWrite,
            EtlError::Yaml(_) | EtlError::Config { .. } => ErrorKind::Config,
        }
    }

    pub(crate) fn unavailable(source_name: impl Into<String>, message: impl fmt::Display) -> Self {
        EtlError::SourceUnavailable {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn format(source_name: impl Into<String>, message: impl fmt::Display) -> Self {
        EtlError::SourceFormat {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn sink(table: impl Into<String>, message: impl fmt::Display) -> Self {
        EtlError::SinkWrite {
            table: table.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn config(message: impl fmt::Display) -> Self {
        EtlError::Config {
            message: message.to_string(),
        }
    }

    pub(crate) fn missing_column(column: &str, available: &[String]) -> Self {
        EtlError::SchemaMismatch {
            message: format!("missing required column '{column}'. columns={available:?}"),
        }
    }
}

/// A single row rejected by a cleaning step.
///
/// Recorded for diagnostics; the row is dropped and the run continues.
#[derive(Debug, Clone, PartialEq)]
pub struct RowValidationError {
    /// 0-based position of the row in the dataset the step received.
    pub row: usize,
    pub column: String,
    pub raw: String,
    pub reason: String,
}

impl fmt::Display for RowValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} column '{}': {} (raw='{}')",
            self.row, self.column, self.reason, self.raw
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, EtlError};

    #[test]
    fn record_fetch_is_classified_as_unavailable_and_names_the_index() {
        let err = EtlError::RecordFetch {
            index: 2,
            url: "https://api.example/store/2".to_string(),
            status: 503,
        };
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
        assert!(err.to_string().contains("record 2"));
    }

    #[test]
    fn schema_mismatch_is_a_format_error() {
        let err = EtlError::missing_column("weight", &["name".to_string()]);
        assert_eq!(err.kind(), ErrorKind::SourceFormat);
        assert!(err.to_string().contains("missing required column 'weight'"));
    }

    #[test]
    fn sink_errors_keep_their_table() {
        let err = EtlError::sink("dim_users", "disk full");
        assert_eq!(err.kind(), ErrorKind::SinkWrite);
        assert_eq!(err.to_string(), "failed to write table 'dim_users': disk full");
    }
}
