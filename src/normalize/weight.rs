//! Product weights.
//!
//! Accepted spellings (case-insensitive, trailing `.` noise ignored):
//!
//! - `<number><unit>` with optional space: `1.6kg`, `750 g`, `16oz`, `500ml`
//! - `<count> x <number><unit>` multipacks: `12 x 100g`, `3x2kg`
//!
//! Units: `kg`, `g`, `ml` (1 ml counts as 1 g), `oz` (0.0283495 kg). A unit is required;
//! ranges such as `1-2kg` are rejected.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::EtlResult;
use crate::types::{DataSet, DataType, Field, Value};

use super::{DropLog, normalize_column};

pub const KG_PER_OZ: f64 = 0.0283495;

static MULTIPACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s*x\s*(\d+(?:\.\d+)?)\s*(kg|g|ml|oz)$").expect("multipack pattern is valid")
});
static SINGLE: LazyLock<Regex> =
    LazyLock::new(|| {
        Regex::new(r"^(\d+(?:\.\d+)?)\s*(kg|g|ml|oz)$").expect("weight pattern is valid")
    });

/// Convert a weight string to kilograms.
pub fn parse_weight_kg(raw: &str) -> Result<f64, String> {
    let cleaned = raw.trim().to_lowercase();
    let cleaned = cleaned.trim_end_matches(|c: char| c == '.' || c.is_whitespace());

    let (count, amount, unit) = if let Some(caps) = MULTIPACK.captures(cleaned) {
        (number(&caps[1])?, number(&caps[2])?, caps[3].to_string())
    } else if let Some(caps) = SINGLE.captures(cleaned) {
        (1.0, number(&caps[1])?, caps[2].to_string())
    } else {
        return Err(format!("unrecognised weight '{raw}'"));
    };

    let kg = match unit.as_str() {
        "kg" => count * amount,
        "g" | "ml" => count * amount / 1000.0,
        "oz" => count * amount * KG_PER_OZ,
        other => return Err(format!("unknown unit '{other}'")),
    };
    if !kg.is_finite() || kg <= 0.0 {
        return Err(format!("weight must be positive, got {kg}"));
    }
    Ok(kg)
}

fn number(s: &str) -> Result<f64, String> {
    s.parse::<f64>().map_err(|e| format!("bad number '{s}': {e}"))
}

/// Weight band used for delivery planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightClass {
    /// Under 2 kg.
    Light,
    /// 2 kg to 40 kg inclusive.
    MidSized,
    /// Over 40 kg up to 140 kg inclusive.
    Heavy,
    /// Over 140 kg.
    TruckRequired,
    /// Zero, negative or not a number.
    Invalid,
}

impl WeightClass {
    pub const LABELS: [&'static str; 4] = ["Light", "Mid_Sized", "Heavy", "Truck_Required"];

    pub fn from_kg(kg: f64) -> Self {
        if !kg.is_finite() || kg <= 0.0 {
            WeightClass::Invalid
        } else if kg < 2.0 {
            WeightClass::Light
        } else if kg <= 40.0 {
            WeightClass::MidSized
        } else if kg <= 140.0 {
            WeightClass::Heavy
        } else {
            WeightClass::TruckRequired
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeightClass::Light => "Light",
            WeightClass::MidSized => "Mid_Sized",
            WeightClass::Heavy => "Heavy",
            WeightClass::TruckRequired => "Truck_Required",
            WeightClass::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for WeightClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rewrite `column` as kilograms ([`Value::Float64`]); unparseable weights drop the row.
pub fn normalize_weights(mut ds: DataSet, column: &str, log: &mut DropLog) -> EtlResult<DataSet> {
    ds = normalize_column(ds, column, "weight", log, |v| match v {
        Value::Float64(kg) if *kg > 0.0 && kg.is_finite() => Ok(Value::Float64(*kg)),
        Value::Utf8(s) => parse_weight_kg(s).map(Value::Float64),
        other => Err(format!("not a weight: {other:?}")),
    })?;
    let idx = ds.column_index(column)?;
    ds.set_field(idx, DataType::Float64, false);
    Ok(ds)
}

/// Append `class_column` holding the [`WeightClass`] of each kilogram weight in
/// `weight_column`. Rows classed [`WeightClass::Invalid`] are dropped.
pub fn derive_weight_class(
    mut ds: DataSet,
    weight_column: &str,
    class_column: &str,
    log: &mut DropLog,
) -> EtlResult<DataSet> {
    let idx = ds.column_index(weight_column)?;
    let classes: Vec<Value> = ds
        .rows
        .iter()
        .map(|row| {
            let class = match row[idx] {
                Value::Float64(kg) => WeightClass::from_kg(kg),
                _ => WeightClass::Invalid,
            };
            Value::text(class.as_str())
        })
        .collect();
    ds.push_column(
        Field::required(class_column, DataType::category(&WeightClass::LABELS)),
        classes,
    )?;
    normalize_column(ds, class_column, "weight_class", log, |v| match v.as_str() {
        Some(label) if label != WeightClass::Invalid.as_str() => Ok(v.clone()),
        _ => Err("weight does not fall in any class".to_string()),
    })
}
