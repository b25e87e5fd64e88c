use crate::error::EtlResult;
use crate::normalize::DropLog;
use crate::normalize::codes::{CodeFormat, format_codes};
use crate::normalize::nulls::{NullRule, purge_nulls};
use crate::normalize::uuids::validate_uuids;
use crate::types::DataSet;

use super::{Cleaned, DatasetKind, finish};

/// Columns of the legacy orders table that are not part of the fact table.
const INTERNAL_COLUMNS: &[&str] = &["level_0", "index", "first_name", "last_name", "1"];

/// Clean the legacy orders table into the `orders_table` fact table.
pub fn clean_orders_data(raw: DataSet) -> EtlResult<Cleaned> {
    let rows_in = raw.row_count();
    let mut log = DropLog::default();
    let mut ds = raw;
    ds.drop_columns(INTERNAL_COLUMNS);

    let rules = [
        NullRule::drop_row("date_uuid"),
        NullRule::drop_row("user_uuid"),
        NullRule::drop_row("card_number"),
        NullRule::drop_row("store_code"),
        NullRule::drop_row("product_code"),
        NullRule::drop_row("product_quantity"),
    ];
    ds = purge_nulls(ds, &rules, &mut log)?;

    ds = validate_uuids(ds, "date_uuid", &mut log)?;
    ds = validate_uuids(ds, "user_uuid", &mut log)?;
    ds = format_codes(ds, "card_number", CodeFormat::Digits, &mut log)?;
    ds = format_codes(ds, "store_code", CodeFormat::Upper, &mut log)?;
    ds = format_codes(ds, "product_code", CodeFormat::Lower, &mut log)?;

    finish(DatasetKind::Orders, rows_in, ds, log)
}
