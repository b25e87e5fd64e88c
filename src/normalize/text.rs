//! Free-text repairs.

use crate::error::EtlResult;
use crate::types::{DataSet, Value};

/// Apply `f` to every text cell of `column`. Other cells are left alone.
pub fn map_text_column<F>(mut ds: DataSet, column: &str, f: F) -> EtlResult<DataSet>
where
    F: Fn(&str) -> String,
{
    let idx = ds.column_index(column)?;
    ds.update_column(idx, |v| match v {
        Value::Utf8(s) => Value::Utf8(f(s)),
        other => other.clone(),
    });
    Ok(ds)
}

/// Collapse the doubled `@@` some exports produce.
pub fn repair_email(s: &str) -> String {
    let mut out = s.trim().to_string();
    while out.contains("@@") {
        out = out.replace("@@", "@");
    }
    out
}

/// Join multi-line text with `separator`, dropping blank lines.
pub fn fold_lines(s: &str, separator: &str) -> String {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Single-line, title-cased postal address whose last two tokens (the postcode) are
/// upper-case.
pub fn tidy_address(s: &str) -> String {
    let words: Vec<String> = fold_lines(s, " ")
        .split_whitespace()
        .map(title_case_word)
        .collect();
    let split = words.len().saturating_sub(2);
    words
        .iter()
        .enumerate()
        .map(|(i, w)| if i >= split && words.len() > 2 { w.to_uppercase() } else { w.clone() })
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Remove every letter; used for numeric fields with typos such as `J78`.
pub fn strip_letters(s: &str) -> String {
    s.chars().filter(|c| !c.is_alphabetic()).collect::<String>().trim().to_string()
}

/// Remove currency symbols, thousands separators and whitespace: `£1,299.99` -> `1299.99`.
pub fn strip_currency(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '£' | '$' | '€' | ',') && !c.is_whitespace())
        .collect()
}
