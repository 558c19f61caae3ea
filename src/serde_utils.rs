//! Shared deserialization helpers.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize a monetary amount leniently.
///
/// Accepts JSON numbers and numeric strings. Anything else (including negative
/// values and `null`) decodes as `0.0` instead of failing the whole record.
pub fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_amount_value(&value))
}

fn parse_amount_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().map(non_negative).unwrap_or(0.0),
        Value::String(s) => parse_amount(s),
        _ => 0.0,
    }
}

/// Parse a user-supplied amount string; non-numeric input is zero.
pub fn parse_amount(raw: &str) -> f64 {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .map(non_negative)
        .unwrap_or(0.0)
}

fn non_negative(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}
