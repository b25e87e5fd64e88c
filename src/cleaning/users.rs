use crate::error::EtlResult;
use crate::normalize::DropLog;
use crate::normalize::category::correct_categories;
use crate::normalize::codes::normalize_phone_numbers;
use crate::normalize::dates::parse_dates;
use crate::normalize::dedup::{DedupKey, dedup_rows};
use crate::normalize::nulls::{NullRule, purge_nulls};
use crate::normalize::text::{map_text_column, repair_email, tidy_address};
use crate::normalize::uuids::validate_uuids;
use crate::types::DataSet;

use super::targets::country_codes;
use super::{Cleaned, DatasetKind, finish};

/// Clean the legacy user records into `dim_users`.
pub fn clean_user_data(raw: DataSet) -> EtlResult<Cleaned> {
    let rows_in = raw.row_count();
    let mut log = DropLog::default();
    let mut ds = raw;
    ds.drop_columns(&["index"]);

    let rules = [
        NullRule::drop_row("first_name"),
        NullRule::drop_row("last_name"),
        NullRule::drop_row("date_of_birth").with_noise(),
        NullRule::set_null("company"),
        NullRule::drop_row("email_address"),
        NullRule::drop_row("address"),
        NullRule::drop_row("country").with_noise(),
        NullRule::drop_row("country_code").with_noise(),
        NullRule::drop_row("phone_number"),
        NullRule::drop_row("join_date").with_noise(),
        NullRule::drop_row("user_uuid"),
    ];
    ds = purge_nulls(ds, &rules, &mut log)?;
    ds = dedup_rows(ds, &DedupKey::FullRow, &mut log)?;

    ds = parse_dates(ds, "date_of_birth", &mut log)?;
    ds = parse_dates(ds, "join_date", &mut log)?;
    ds = correct_categories(ds, "country_code", &country_codes(), &mut log)?;
    ds = map_text_column(ds, "email_address", repair_email)?;
    ds = map_text_column(ds, "address", tidy_address)?;
    ds = normalize_phone_numbers(ds, "phone_number", "phone_ext", &mut log)?;
    ds = validate_uuids(ds, "user_uuid", &mut log)?;

    finish(DatasetKind::Users, rows_in, ds, log)
}
