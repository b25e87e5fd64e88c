//! Date and time parsing.
//!
//! Sources mix several spellings of the same date (`2005-03-19`, `2005 March 19`,
//! `March 2005 19`, `2005/03/19`). Anything that matches none of the known formats is
//! dropped.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{EtlResult, RowValidationError};
use crate::types::{DataSet, DataType, Value};

use super::{DropLog, normalize_column};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y %B %d", "%B %Y %d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] =
    &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

/// Parse a calendar date in any supported format. Datetimes keep their date part.
pub fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Parse a time of day.
pub fn parse_time_str(raw: &str) -> Option<NaiveTime> {
    let s = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

/// Convert `column` to [`Value::Date`], dropping rows that do not parse.
pub fn parse_dates(mut ds: DataSet, column: &str, log: &mut DropLog) -> EtlResult<DataSet> {
    let step = format!("dates:{column}");
    ds = normalize_column(ds, column, &step, log, |v| match v {
        Value::Date(d) => Ok(Value::Date(*d)),
        Value::Utf8(s) => parse_date_str(s)
            .map(Value::Date)
            .ok_or_else(|| "unrecognised date".to_string()),
        _ => Err("not a date".to_string()),
    })?;
    let idx = ds.column_index(column)?;
    ds.set_field(idx, DataType::Date, false);
    Ok(ds)
}

/// Convert `column` to [`Value::Time`], dropping rows that do not parse.
pub fn parse_times(mut ds: DataSet, column: &str, log: &mut DropLog) -> EtlResult<DataSet> {
    let step = format!("times:{column}");
    ds = normalize_column(ds, column, &step, log, |v| match v {
        Value::Time(t) => Ok(Value::Time(*t)),
        Value::Utf8(s) => parse_time_str(s)
            .map(Value::Time)
            .ok_or_else(|| "unrecognised time".to_string()),
        _ => Err("not a time".to_string()),
    })?;
    let idx = ds.column_index(column)?;
    ds.set_field(idx, DataType::Time, false);
    Ok(ds)
}

/// Require `year`, `month` and `day` columns to form a real calendar date.
///
/// The three columns become [`Value::Int64`]; rows naming an impossible date
/// (`2021-02-30`) or non-numeric parts are dropped.
pub fn validate_calendar_parts(
    mut ds: DataSet,
    year: &str,
    month: &str,
    day: &str,
    log: &mut DropLog,
) -> EtlResult<DataSet> {
    let idxs = [ds.column_index(year)?, ds.column_index(month)?, ds.column_index(day)?];

    let mut rejected = Vec::new();
    let mut kept = Vec::with_capacity(ds.rows.len());
    for (pos, mut row) in std::mem::take(&mut ds.rows).into_iter().enumerate() {
        let parts: Vec<Option<i64>> = idxs.iter().map(|&i| integer(&row[i])).collect();
        let valid = match parts.as_slice() {
            &[Some(y), Some(m), Some(d)] => i32::try_from(y)
                .ok()
                .zip(u32::try_from(m).ok())
                .zip(u32::try_from(d).ok())
                .and_then(|((y, m), d)| NaiveDate::from_ymd_opt(y, m, d))
                .map(|_| [y, m, d]),
            _ => None,
        };
        match valid {
            Some(values) => {
                for (&i, v) in idxs.iter().zip(values) {
                    row[i] = Value::Int64(v);
                }
                kept.push(row);
            }
            None => rejected.push(RowValidationError {
                row: pos,
                column: format!("{year}/{month}/{day}"),
                raw: idxs
                    .iter()
                    .map(|&i| row[i].to_text().unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join("-"),
                reason: "not a calendar date".to_string(),
            }),
        }
    }
    ds.rows = kept;
    log.record("calendar", rejected);
    for idx in idxs {
        ds.set_field(idx, DataType::Int64, false);
    }
    Ok(ds)
}

fn integer(v: &Value) -> Option<i64> {
    match v {
        Value::Int64(n) => Some(*n),
        Value::Utf8(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::{parse_date_str, parse_dates, parse_time_str, validate_calendar_parts};
    use crate::normalize::DropLog;
    use crate::types::{DataSet, DataType, Value};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn mixed_spellings_parse_to_the_same_date() {
        for raw in ["2005-03-19", "2005 March 19", "March 2005 19", "2005/03/19", " 2005-03-19 "] {
            assert_eq!(parse_date_str(raw), Some(d(2005, 3, 19)), "{raw}");
        }
        assert_eq!(parse_date_str("2005-03-19 14:02:11"), Some(d(2005, 3, 19)));
        assert_eq!(parse_date_str("19/03/2005"), None);
        assert_eq!(parse_date_str("2005-02-30"), None);
    }

    #[test]
    fn times_parse_with_and_without_seconds() {
        assert_eq!(parse_time_str("22:00:06"), NaiveTime::from_hms_opt(22, 0, 6));
        assert_eq!(parse_time_str("09:15"), NaiveTime::from_hms_opt(9, 15, 0));
        assert_eq!(parse_time_str("25:00:00"), None);
    }

    #[test]
    fn unparseable_dates_are_dropped_and_column_is_typed() {
        let ds = DataSet::from_columns(
            ["join_date"],
            vec![
                vec![Value::text("2016 October 31")],
                vec![Value::text("GB")],
                vec![Value::Date(d(2020, 1, 1))],
            ],
        );
        let mut log = DropLog::default();
        let ds = parse_dates(ds, "join_date", &mut log).unwrap();
        assert_eq!(
            ds.rows,
            vec![vec![Value::Date(d(2016, 10, 31))], vec![Value::Date(d(2020, 1, 1))]]
        );
        assert_eq!(ds.schema.fields[0].data_type, DataType::Date);
        assert_eq!(log.dropped_by("dates:join_date"), 1);
    }

    #[test]
    fn impossible_calendar_dates_are_dropped() {
        let ds = DataSet::from_columns(
            ["day", "month", "year"],
            vec![
                vec![Value::text("19"), Value::text("9"), Value::text("2012")],
                vec![Value::text("30"), Value::text("2"), Value::text("2021")],
                vec![Value::text("29"), Value::text("2"), Value::text("2020")],
                vec![Value::text("x"), Value::text("1"), Value::text("2020")],
            ],
        );
        let mut log = DropLog::default();
        let ds = validate_calendar_parts(ds, "year", "month", "day", &mut log).unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.rows[1], vec![Value::Int64(29), Value::Int64(2), Value::Int64(2020)]);
        assert_eq!(log.dropped_by("calendar"), 2);
    }
}
