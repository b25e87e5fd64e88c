//! Delimited-text extraction.

use std::io::Read;

use crate::error::EtlResult;
use crate::types::{DataSet, SourceKind, Value};

/// Parse delimited text with a header row into an untyped [`DataSet`].
///
/// Rules:
///
/// - The first record is the header.
/// - A blank or `Unnamed: 0` first header (a writer's row-index column) becomes `index`; other
///   blank headers become `unnamed_<position>`.
/// - Cells are trimmed; empty cells become [`Value::Null`], everything else [`Value::Utf8`].
pub fn read_csv_from_bytes(bytes: &[u8]) -> EtlResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);
    read_csv_from_reader(&mut rdr)
}

/// Parse CSV data from an existing CSV reader.
pub fn read_csv_from_reader<R: Read>(rdr: &mut csv::Reader<R>) -> EtlResult<DataSet> {
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| header_name(i, h))
        .collect();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row = (0..headers.len())
            .map(|i| cell_value(record.get(i).unwrap_or("")))
            .collect();
        rows.push(row);
    }

    Ok(DataSet::from_columns(headers, rows).with_source(SourceKind::ObjectStore))
}

fn header_name(position: usize, raw: &str) -> String {
    let trimmed = raw.trim();
    if position == 0 && trimmed == "Unnamed: 0" {
        return "index".to_string();
    }
    match (position, trimmed.is_empty()) {
        (0, true) => "index".to_string(),
        (_, true) => format!("unnamed_{position}"),
        _ => trimmed.to_string(),
    }
}

fn cell_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::text(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::read_csv_from_bytes;
    use crate::types::Value;

    #[test]
    fn blank_leading_header_becomes_index() {
        let input = b",product_name,weight\n0,Kettle,1.6kg\n1,Mug,\n";
        let ds = read_csv_from_bytes(input).unwrap();
        assert_eq!(ds.column_names(), vec!["index", "product_name", "weight"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.get(0, "weight"), Some(&Value::text("1.6kg")));
        assert_eq!(ds.get(1, "weight"), Some(&Value::Null));
    }

    #[test]
    fn unnamed_index_header_becomes_index() {
        let ds = read_csv_from_bytes(b"Unnamed: 0,product_name\n0,Kettle\n").unwrap();
        assert_eq!(ds.column_names(), vec!["index", "product_name"]);
    }

    #[test]
    fn quoted_cells_keep_embedded_commas() {
        let input = b"name,price\n\"Sofa, grey\",\xc2\xa3499.00\n";
        let ds = read_csv_from_bytes(input).unwrap();
        assert_eq!(ds.get(0, "name"), Some(&Value::text("Sofa, grey")));
        assert_eq!(ds.get(0, "price"), Some(&Value::text("£499.00")));
    }

    #[test]
    fn ragged_rows_are_a_csv_error() {
        let input = b"a,b\n1,2,3\n";
        let err = read_csv_from_bytes(input).unwrap_err();
        assert!(err.to_string().contains("csv error"));
    }
}
