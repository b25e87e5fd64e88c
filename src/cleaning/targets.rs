//! Warehouse table shapes.
//!
//! Column order here is the column order of the persisted table.

use crate::normalize::category::CategoryMap;
use crate::normalize::weight::WeightClass;
use crate::types::{DataType, Field, Schema};

/// Name, schema and primary key of a warehouse table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTable {
    pub name: &'static str,
    pub schema: Schema,
    /// Column whose values must be unique, if any.
    pub primary_key: Option<&'static str>,
}

pub fn country_codes() -> CategoryMap {
    CategoryMap::new(&["GB", "DE", "US"]).alias("GGB", "GB")
}

pub fn continents() -> CategoryMap {
    CategoryMap::new(&["Europe", "America"])
        .alias("eeEurope", "Europe")
        .alias("eeAmerica", "America")
}

pub fn store_types() -> CategoryMap {
    CategoryMap::new(&["Local", "Super Store", "Mall Kiosk", "Outlet", "Web Portal"])
}

pub fn availability() -> CategoryMap {
    CategoryMap::new(&["Still_available", "Removed"]).alias("Still_avaliable", "Still_available")
}

pub fn time_periods() -> CategoryMap {
    CategoryMap::new(&["Evening", "Midday", "Morning", "Late_Hours"])
}

pub fn dim_users() -> TargetTable {
    TargetTable {
        name: "dim_users",
        schema: Schema::new(vec![
            Field::required("first_name", DataType::VarChar(255)),
            Field::required("last_name", DataType::VarChar(255)),
            Field::required("date_of_birth", DataType::Date),
            Field::new("company", DataType::VarChar(255)),
            Field::required("email_address", DataType::VarChar(255)),
            Field::required("address", DataType::Utf8),
            Field::required("country", DataType::VarChar(255)),
            Field::required("country_code", country_codes().data_type()),
            Field::required("phone_number", DataType::VarChar(32)),
            Field::new("phone_ext", DataType::VarChar(10)),
            Field::required("join_date", DataType::Date),
            Field::required("user_uuid", DataType::Uuid),
        ]),
        primary_key: Some("user_uuid"),
    }
}

pub fn dim_card_details() -> TargetTable {
    TargetTable {
        name: "dim_card_details",
        schema: Schema::new(vec![
            Field::required("card_number", DataType::VarChar(22)),
            Field::required("expiry_date", DataType::VarChar(5)),
            Field::required("card_provider", DataType::VarChar(255)),
            Field::required("date_payment_confirmed", DataType::Date),
        ]),
        primary_key: Some("card_number"),
    }
}

pub fn dim_store_details() -> TargetTable {
    TargetTable {
        name: "dim_store_details",
        schema: Schema::new(vec![
            Field::required("store_code", DataType::VarChar(12)),
            Field::new("address", DataType::Utf8),
            Field::new("locality", DataType::VarChar(255)),
            Field::new("longitude", DataType::Float64),
            Field::new("latitude", DataType::Float64),
            Field::required("staff_numbers", DataType::Int64),
            Field::required("opening_date", DataType::Date),
            Field::required("store_type", store_types().data_type()),
            Field::required("country_code", country_codes().data_type()),
            Field::required("continent", continents().data_type()),
        ]),
        primary_key: Some("store_code"),
    }
}

pub fn dim_products() -> TargetTable {
    TargetTable {
        name: "dim_products",
        schema: Schema::new(vec![
            Field::required("product_code", DataType::VarChar(16)),
            Field::required("product_name", DataType::VarChar(255)),
            Field::required("product_price", DataType::Float64),
            Field::required("weight", DataType::Float64),
            Field::required("weight_class", DataType::category(&WeightClass::LABELS)),
            Field::required("category", DataType::VarChar(64)),
            Field::required("EAN", DataType::VarChar(17)),
            Field::required("date_added", DataType::Date),
            Field::required("uuid", DataType::Uuid),
            Field::required("removed", availability().data_type()),
        ]),
        primary_key: Some("product_code"),
    }
}

pub fn orders_table() -> TargetTable {
    TargetTable {
        name: "orders_table",
        schema: Schema::new(vec![
            Field::required("date_uuid", DataType::Uuid),
            Field::required("user_uuid", DataType::Uuid),
            Field::required("card_number", DataType::VarChar(22)),
            Field::required("store_code", DataType::VarChar(12)),
            Field::required("product_code", DataType::VarChar(16)),
            Field::required("product_quantity", DataType::Int64),
        ]),
        primary_key: None,
    }
}

pub fn dim_date_times() -> TargetTable {
    TargetTable {
        name: "dim_date_times",
        schema: Schema::new(vec![
            Field::required("date_uuid", DataType::Uuid),
            Field::required("timestamp", DataType::Time),
            Field::required("day", DataType::Int64),
            Field::required("month", DataType::Int64),
            Field::required("year", DataType::Int64),
            Field::required("time_period", time_periods().data_type()),
        ]),
        primary_key: Some("date_uuid"),
    }
}
