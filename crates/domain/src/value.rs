//! Loose conversions over JSON values.
//!
//! Parameters and action targets arrive as untyped JSON. These helpers decide
//! whether a value can be read as a number, a boolean or text.

use serde_json::{Number, Value};

/// Numeric reading of a value: numbers, numeric strings and booleans.
#[must_use]
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Strict boolean reading: booleans, numbers and the usual textual spellings.
#[must_use]
pub fn try_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Some(true),
            "false" | "off" | "no" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Lenient boolean reading; anything unreadable is `false`.
#[must_use]
pub fn as_bool(value: &Value) -> bool {
    try_as_bool(value).unwrap_or(false)
}

/// Text reading of scalar values. Containers have no text form.
#[must_use]
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse text as a JSON number, keeping integers integral.
#[must_use]
pub fn parse_number(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// Serde helpers accepting numbers written as strings, as produced by
/// placeholder substitution of text parameters.
pub mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::as_f64;

    fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        as_f64(&raw)
            .filter(|n| n.is_finite())
            .ok_or_else(|| D::Error::custom(format!("expected a number, got {raw}")))
    }

    /// # Errors
    ///
    /// Fails for values that are not numeric.
    pub fn f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        number(deserializer)
    }

    /// # Errors
    ///
    /// Fails for values that are not non-negative integers.
    pub fn u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let n = number(deserializer)?;
        if n < 0.0 || n.fract() != 0.0 || n > 9_007_199_254_740_992.0 {
            return Err(D::Error::custom(format!("expected a non-negative integer, got {n}")));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(n as u64)
    }

    /// # Errors
    ///
    /// Fails for values that are not non-negative integers fitting in 32 bits.
    pub fn u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let n = u64(deserializer)?;
        std::primitive::u32::try_from(n).map_err(D::Error::custom)
    }
}
