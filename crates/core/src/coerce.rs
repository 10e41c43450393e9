// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loose coercion of untyped settings values.
//!
//! Host frameworks hand settings over as JSON-like maps where a port may
//! arrive as `26500` or `"26500"`. Every function here returns `Ok(None)`
//! for a missing key, `null`, or an empty/blank string, so callers can tell
//! "unset" apart from a value that is present but malformed.

use crate::config::{ConfigError, RawSettings};
use serde_json::Value;

/// Present, non-null value for `key`, treating blank strings as unset.
fn present<'a>(values: &'a RawSettings, key: &str) -> Option<&'a Value> {
    match values.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v),
    }
}

/// Whether `key` carries a value that is not unset.
pub(crate) fn is_set(values: &RawSettings, key: &str) -> bool {
    present(values, key).is_some()
}

fn invalid(key: &str, expected: &'static str, found: &Value) -> ConfigError {
    ConfigError::InvalidType {
        key: key.to_string(),
        expected,
        found: describe(found),
    }
}

/// Short description of a value for error messages.
pub fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

pub fn to_string(values: &RawSettings, key: &str) -> Result<Option<String>, ConfigError> {
    match present(values, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(invalid(key, "a string", other)),
    }
}

pub fn to_i64(values: &RawSettings, key: &str) -> Result<Option<i64>, ConfigError> {
    let Some(value) = present(values, key) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| invalid(key, "an integer", value))
}

pub fn to_f64(values: &RawSettings, key: &str) -> Result<Option<f64>, ConfigError> {
    let Some(value) = present(values, key) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .map(Some)
        .ok_or_else(|| invalid(key, "a number", value))
}

pub fn to_bool(values: &RawSettings, key: &str) -> Result<Option<bool>, ConfigError> {
    let Some(value) = present(values, key) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| invalid(key, "a boolean", value))
}

#[cfg(test)]
#[path = "coerce_tests.rs"]
mod tests;
