use crate::error::EtlResult;
use crate::normalize::DropLog;
use crate::normalize::category::correct_categories;
use crate::normalize::dates::{parse_times, validate_calendar_parts};
use crate::normalize::nulls::{NullRule, purge_nulls};
use crate::normalize::uuids::validate_uuids;
use crate::types::DataSet;

use super::targets::time_periods;
use super::{Cleaned, DatasetKind, finish};

/// Clean sale date events into `dim_date_times`.
pub fn clean_date_events_data(raw: DataSet) -> EtlResult<Cleaned> {
    let rows_in = raw.row_count();
    let mut log = DropLog::default();
    let mut ds = raw;

    let rules = [
        NullRule::drop_row("timestamp").with_noise(),
        NullRule::drop_row("month").with_noise(),
        NullRule::drop_row("year").with_noise(),
        NullRule::drop_row("day").with_noise(),
        NullRule::drop_row("time_period").with_noise(),
        NullRule::drop_row("date_uuid"),
    ];
    ds = purge_nulls(ds, &rules, &mut log)?;

    ds = validate_calendar_parts(ds, "year", "month", "day", &mut log)?;
    ds = parse_times(ds, "timestamp", &mut log)?;
    ds = correct_categories(ds, "time_period", &time_periods(), &mut log)?;
    ds = validate_uuids(ds, "date_uuid", &mut log)?;

    finish(DatasetKind::DateEvents, rows_in, ds, log)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::clean_date_events_data;
    use crate::extraction::json::read_json_from_str;
    use crate::types::Value;

    #[test]
    fn column_oriented_document_is_cleaned() {
        let doc = r#"{
            "timestamp": {"0": "22:00:06", "1": "17:24:54", "2": "NULL", "3": "09:00:00"},
            "month": {"0": "9", "1": "2", "2": "NULL", "3": "2"},
            "year": {"0": "2012", "1": "1997", "2": "NULL", "3": "2021"},
            "day": {"0": "19", "1": "10", "2": "NULL", "3": "30"},
            "time_period": {"0": "Evening", "1": "Evening", "2": "NULL", "3": "Morning"},
            "date_uuid": {"0": "3b7ca996-37f9-433f-b6d0-ce8391b615ad", "1": "adc86836-6c35-49ca-bb0d-65b6507a00fa", "2": "NULL", "3": "5ff791bf-d1fc-45e9-a1c8-3a6d2a2d3e0f"}
        }"#;
        let raw = read_json_from_str(doc, "date_details.json").unwrap();
        let cleaned = clean_date_events_data(raw).unwrap();
        let out = &cleaned.dataset;

        assert_eq!(
            out.column_names(),
            vec!["date_uuid", "timestamp", "day", "month", "year", "time_period"]
        );
        assert_eq!(out.row_count(), 2);
        let ten_pm = NaiveTime::from_hms_opt(22, 0, 6).unwrap();
        assert_eq!(out.get(0, "timestamp"), Some(&Value::Time(ten_pm)));
        assert_eq!(out.get(1, "year"), Some(&Value::Int64(1997)));
        assert_eq!(cleaned.report.drops.dropped_by("null_purge"), 1);
        assert_eq!(cleaned.report.drops.dropped_by("calendar"), 1);
    }
}
