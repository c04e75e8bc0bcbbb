//! Forgiving deserializers for marketplace records.
//!
//! Listings come straight out of user-edited forms, so numeric columns are
//! sometimes numbers, sometimes strings and sometimes garbage. Anything that
//! cannot be read as the expected type becomes `None` instead of failing the
//! whole record.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::models::domain::{Dimension, GrowthPotential};

/// Deserialize an optional decimal from a number or a numeric string
pub fn decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_decimal))
}

/// Deserialize an optional non-negative integer count
pub fn count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_decimal).and_then(to_count))
}

/// Deserialize an optional free-text field; blank strings become `None`
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_text))
}

/// Deserialize a list of strings, accepting a single string as a one-element list
pub fn text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let items = match value {
        Some(Value::Array(items)) => items.iter().filter_map(parse_text).collect(),
        Some(other) => parse_text(&other).into_iter().collect(),
        None => Vec::new(),
    };
    Ok(items)
}

/// Deserialize an optional growth potential, ignoring unknown labels
pub fn growth<'de, D>(deserializer: D) -> Result<Option<GrowthPotential>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok()))
}

/// Deserialize the selected dimension names, dropping the ones we do not score
pub fn dimensions<'de, D>(deserializer: D) -> Result<BTreeSet<Dimension>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = text_list(deserializer)?;
    Ok(names.iter().filter_map(|name| name.parse().ok()).collect())
}

/// Read a finite decimal out of a JSON value
pub fn parse_decimal(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal_str(s),
        _ => None,
    }?;

    number.is_finite().then_some(number)
}

/// Parse a decimal written by a human: "150000", " 150 000 ", "1_200.5"
pub fn parse_decimal_str(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn to_count(number: f64) -> Option<u32> {
    if number < 0.0 || number > u32::MAX as f64 {
        return None;
    }
    Some(number.trunc() as u32)
}

fn parse_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
