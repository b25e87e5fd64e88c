use crate::error::EtlResult;
use crate::normalize::category::correct_categories;
use crate::normalize::codes::{CodeFormat, format_codes};
use crate::normalize::dates::parse_dates;
use crate::normalize::nulls::{NullRule, purge_nulls};
use crate::normalize::text::{map_text_column, strip_currency};
use crate::normalize::uuids::validate_uuids;
use crate::normalize::weight::{derive_weight_class, normalize_weights};
use crate::normalize::{DropLog, normalize_column};
use crate::types::{DataSet, Value};

use super::targets::availability;
use super::{Cleaned, DatasetKind, finish};

/// Clean the product catalogue into `dim_products`.
///
/// Weights become kilograms and each product gains a `weight_class`.
pub fn clean_products_data(raw: DataSet) -> EtlResult<Cleaned> {
    let rows_in = raw.row_count();
    let mut log = DropLog::default();
    let mut ds = raw;
    ds.drop_columns(&["index"]);

    let rules = [
        NullRule::drop_row("product_name"),
        NullRule::drop_row("product_price"),
        NullRule::drop_row("weight"),
        NullRule::drop_row("category").with_noise(),
        NullRule::drop_row("EAN"),
        NullRule::drop_row("date_added").with_noise(),
        NullRule::drop_row("uuid"),
        NullRule::drop_row("removed").with_noise(),
        NullRule::drop_row("product_code"),
    ];
    ds = purge_nulls(ds, &rules, &mut log)?;

    ds = normalize_weights(ds, "weight", &mut log)?;
    ds = derive_weight_class(ds, "weight", "weight_class", &mut log)?;
    ds = map_text_column(ds, "product_price", strip_currency)?;
    ds = normalize_column(ds, "product_price", "price", &mut log, |v| {
        let price = match v {
            Value::Float64(f) => *f,
            Value::Int64(n) => *n as f64,
            Value::Utf8(s) => s.parse::<f64>().map_err(|_| format!("'{s}' is not a price"))?,
            other => return Err(format!("'{other}' is not a price")),
        };
        if !price.is_finite() || price < 0.0 {
            return Err(format!("price {price} out of range"));
        }
        Ok(Value::Float64((price * 100.0).round() / 100.0))
    })?;
    ds = correct_categories(ds, "removed", &availability(), &mut log)?;
    ds = parse_dates(ds, "date_added", &mut log)?;
    ds = validate_uuids(ds, "uuid", &mut log)?;
    ds = format_codes(ds, "product_code", CodeFormat::Lower, &mut log)?;

    finish(DatasetKind::Products, rows_in, ds, log)
}
