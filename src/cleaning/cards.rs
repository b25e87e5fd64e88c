use std::sync::LazyLock;

use regex::Regex;

use crate::error::EtlResult;
use crate::normalize::codes::{CodeFormat, drop_repeated_headers, format_codes};
use crate::normalize::dates::parse_dates;
use crate::normalize::nulls::{NullRule, purge_nulls};
use crate::normalize::{DropLog, normalize_column};
use crate::types::{DataSet, Value};

use super::{Cleaned, DatasetKind, finish};

static EXPIRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0[1-9]|1[0-2])/\d{2}$").expect("expiry pattern is valid"));

/// Clean card details extracted from the PDF into `dim_card_details`.
pub fn clean_card_data(raw: DataSet) -> EtlResult<Cleaned> {
    let rows_in = raw.row_count();
    let mut log = DropLog::default();
    let mut ds = raw;

    ds = drop_repeated_headers(ds, "card_number", &mut log)?;
    let rules = [
        NullRule::drop_row("card_number"),
        NullRule::drop_row("expiry_date").with_noise(),
        NullRule::drop_row("card_provider").with_noise(),
        NullRule::drop_row("date_payment_confirmed").with_noise(),
    ];
    ds = purge_nulls(ds, &rules, &mut log)?;

    ds = format_codes(ds, "card_number", CodeFormat::Digits, &mut log)?;
    ds = normalize_column(ds, "expiry_date", "expiry_date", &mut log, |v| {
        match v.as_str().map(str::trim) {
            Some(s) if EXPIRY.is_match(s) => Ok(Value::text(s)),
            _ => Err("expiry date is not MM/YY".to_string()),
        }
    })?;
    ds = parse_dates(ds, "date_payment_confirmed", &mut log)?;

    finish(DatasetKind::CardDetails, rows_in, ds, log)
}
