use crate::error::EtlResult;
use crate::normalize::DropLog;
use crate::normalize::category::correct_categories;
use crate::normalize::codes::{CodeFormat, format_codes};
use crate::normalize::dates::parse_dates;
use crate::normalize::nulls::{NullRule, purge_nulls};
use crate::normalize::text::{fold_lines, map_text_column, strip_letters};
use crate::types::DataSet;

use super::targets::{continents, country_codes, store_types};
use super::{Cleaned, DatasetKind, finish};

/// Clean store records from the store API into `dim_store_details`.
///
/// The web store has no physical location: its address, locality and coordinates are
/// `N/A` in the source and become nulls. Rows whose store code, type or country is junk
/// are dropped.
pub fn clean_store_data(raw: DataSet) -> EtlResult<Cleaned> {
    let rows_in = raw.row_count();
    let mut log = DropLog::default();
    let mut ds = raw;
    ds.drop_columns(&["index", "lat"]);

    let rules = [
        NullRule::drop_row("store_code"),
        NullRule::drop_row("store_type").with_noise(),
        NullRule::drop_row("country_code").with_noise(),
        NullRule::drop_row("continent").with_noise(),
        NullRule::drop_row("opening_date").with_noise(),
        NullRule::drop_row("staff_numbers"),
        NullRule::set_null("address"),
        NullRule::set_null("locality"),
        NullRule::set_null("longitude"),
        NullRule::set_null("latitude"),
    ];
    ds = purge_nulls(ds, &rules, &mut log)?;

    ds = correct_categories(ds, "store_type", &store_types(), &mut log)?;
    ds = correct_categories(ds, "country_code", &country_codes(), &mut log)?;
    ds = correct_categories(ds, "continent", &continents(), &mut log)?;
    ds = format_codes(ds, "store_code", CodeFormat::Upper, &mut log)?;
    ds = map_text_column(ds, "staff_numbers", strip_letters)?;
    ds = map_text_column(ds, "address", |s| fold_lines(s, ", "))?;
    ds = map_text_column(ds, "locality", |s| s.trim().to_string())?;
    ds = parse_dates(ds, "opening_date", &mut log)?;

    finish(DatasetKind::StoreDetails, rows_in, ds, log)
}
