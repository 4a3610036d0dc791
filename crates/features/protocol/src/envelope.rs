//! Loosely typed request envelope and its coercion rules.
//!
//! Clients send numbers as strings and strings as numbers. Every accessor falls back to an
//! empty default on a type mismatch instead of failing.

use crate::error::ProtocolError;
use serde_json::{Map, Value};

/// Parsed JSON object of one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    fields: Map<String, Value>,
}

impl Envelope {
    /// Parses the raw `json` form field.
    ///
    /// # Errors
    /// * [`ProtocolError::MissingParameter`] when the field is absent or empty.
    /// * [`ProtocolError::InvalidEncoding`] for malformed JSON or a non-object document.
    pub fn parse(raw: Option<&str>) -> Result<Self, ProtocolError> {
        let raw = raw
            .filter(|raw| !raw.is_empty())
            .ok_or_else(|| ProtocolError::missing("Missing json field"))?;
        match serde_json::from_str(raw) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            _ => Err(ProtocolError::encoding("Invalid JSON")),
        }
    }

    /// String field, `""` when absent or not coercible.
    #[must_use]
    pub fn string(&self, key: &str) -> String {
        self.fields.get(key).and_then(coerce_string).unwrap_or_default()
    }

    /// Integer field, `0` when absent or not coercible.
    #[must_use]
    pub fn int(&self, key: &str) -> i64 {
        self.fields.get(key).and_then(coerce_int).unwrap_or_default()
    }

    /// Word list field, empty when absent or not coercible.
    #[must_use]
    pub fn words(&self, key: &str) -> Vec<String> {
        self.fields.get(key).map(coerce_words).unwrap_or_default()
    }

    /// The envelope with the password masked, for debug logging.
    #[must_use]
    pub fn redacted(&self) -> Value {
        let mut fields = self.fields.clone();
        if let Some(spwd) = fields.get_mut("spwd") {
            *spwd = Value::String("***".to_owned());
        }
        Value::Object(fields)
    }
}

/// Strings pass through; numbers render in plain decimal.
#[must_use]
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integers pass through, floats truncate, strings are trimmed and parsed.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Arrays keep one entry per element (non-strings coerce, or become `""`).
/// A string is split on whitespace.
#[must_use]
pub fn coerce_words(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(|v| coerce_string(v).unwrap_or_default()).collect(),
        Value::String(s) => s.split_whitespace().map(str::to_owned).collect(),
        _ => Vec::new(),
    }
}
