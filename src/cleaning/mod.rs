//! Per-dataset cleaners.
//!
//! Each [`DatasetKind`] has exactly one cleaner. A cleaner applies an ordered sequence of
//! [`crate::normalize`] steps plus dataset-specific rules, then conforms the result to the
//! kind's [`targets::TargetTable`]. The output satisfies, for its table:
//!
//! - no nulls in non-nullable columns
//! - every cell has the column's declared type
//! - category columns hold only their allowed labels
//! - the primary key, if any, is unique
//!
//! Rows that fail any step are dropped and counted in the [`CleaningReport`].

pub mod cards;
pub mod date_events;
pub mod orders;
pub mod products;
pub mod stores;
pub mod targets;
pub mod users;

use std::fmt;
use std::str::FromStr;

use crate::error::EtlResult;
use crate::normalize::coerce::conform;
use crate::normalize::dedup::{DedupKey, dedup_rows};
use crate::normalize::DropLog;
use crate::types::DataSet;

use targets::TargetTable;

pub use cards::clean_card_data;
pub use date_events::clean_date_events_data;
pub use orders::clean_orders_data;
pub use products::clean_products_data;
pub use stores::clean_store_data;
pub use users::clean_user_data;

/// The six datasets loaded into the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Users,
    CardDetails,
    StoreDetails,
    Products,
    Orders,
    DateEvents,
}

impl DatasetKind {
    /// Every kind, in load order.
    pub const ALL: [DatasetKind; 6] = [
        DatasetKind::Users,
        DatasetKind::CardDetails,
        DatasetKind::StoreDetails,
        DatasetKind::Products,
        DatasetKind::Orders,
        DatasetKind::DateEvents,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DatasetKind::Users => "users",
            DatasetKind::CardDetails => "card_details",
            DatasetKind::StoreDetails => "store_details",
            DatasetKind::Products => "products",
            DatasetKind::Orders => "orders",
            DatasetKind::DateEvents => "date_events",
        }
    }

    pub fn target(self) -> TargetTable {
        match self {
            DatasetKind::Users => targets::dim_users(),
            DatasetKind::CardDetails => targets::dim_card_details(),
            DatasetKind::StoreDetails => targets::dim_store_details(),
            DatasetKind::Products => targets::dim_products(),
            DatasetKind::Orders => targets::orders_table(),
            DatasetKind::DateEvents => targets::dim_date_times(),
        }
    }

    /// Warehouse table this kind is loaded into.
    pub fn table_name(self) -> &'static str {
        self.target().name
    }

    /// Run this kind's cleaner.
    pub fn clean(self, raw: DataSet) -> EtlResult<Cleaned> {
        match self {
            DatasetKind::Users => clean_user_data(raw),
            DatasetKind::CardDetails => clean_card_data(raw),
            DatasetKind::StoreDetails => clean_store_data(raw),
            DatasetKind::Products => clean_products_data(raw),
            DatasetKind::Orders => clean_orders_data(raw),
            DatasetKind::DateEvents => clean_date_events_data(raw),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    /// Accepts the kind name (`users`) or its table name (`dim_users`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        DatasetKind::ALL
            .into_iter()
            .find(|k| k.name() == s || k.table_name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = DatasetKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown dataset '{s}', expected one of {}", names.join(", "))
            })
    }
}

/// Rows in and out of a cleaner, with per-step drop counts.
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningReport {
    pub kind: DatasetKind,
    pub rows_in: usize,
    pub rows_out: usize,
    pub drops: DropLog,
}

impl CleaningReport {
    pub fn rows_dropped(&self) -> usize {
        self.drops.total()
    }
}

/// A cleaned dataset and how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Cleaned {
    pub dataset: DataSet,
    pub report: CleaningReport,
}

/// Conform `ds` to the kind's target table, enforce its primary key, and build the report.
fn finish(
    kind: DatasetKind,
    rows_in: usize,
    ds: DataSet,
    mut drops: DropLog,
) -> EtlResult<Cleaned> {
    let target = kind.target();
    let mut ds = conform(ds, &target.schema, &mut drops)?;
    if let Some(pk) = target.primary_key {
        ds = dedup_rows(ds, &DedupKey::columns([pk]), &mut drops)?;
    }
    let report = CleaningReport {
        kind,
        rows_in,
        rows_out: ds.row_count(),
        drops,
    };
    tracing::info!(
        dataset = %kind,
        rows_in,
        rows_out = report.rows_out,
        dropped = report.rows_dropped(),
        "cleaned dataset"
    );
    Ok(Cleaned { dataset: ds, report })
}
