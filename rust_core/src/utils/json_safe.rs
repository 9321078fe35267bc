//! JSON sanitizing for JavaScript consumers.
//!
//! Snowflake-style ids exceed `Number.MAX_SAFE_INTEGER` and silently lose
//! precision when a browser parses them, so integers beyond that bound are
//! emitted as strings. Non-finite floats have no JSON representation at all
//! and become null.

use serde_json::{Map, Number, Value};

/// Largest integer a 64-bit float represents exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Recursively rewrite a JSON value so any JavaScript runtime can parse it
/// without precision loss.
pub fn json_safe(value: Value) -> Value {
    match value {
        Value::Number(number) => safe_number(number),
        Value::Array(items) => Value::Array(items.into_iter().map(json_safe).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, json_safe(v)))
                .collect::<Map<_, _>>(),
        ),
        other => other,
    }
}

fn safe_number(number: Number) -> Value {
    if let Some(n) = number.as_i64() {
        if n.unsigned_abs() > MAX_SAFE_INTEGER as u64 {
            return Value::String(n.to_string());
        }
        return Value::Number(number);
    }
    if let Some(n) = number.as_u64() {
        // Only reachable above i64::MAX, which is always unsafe.
        return Value::String(n.to_string());
    }
    match number.as_f64() {
        Some(f) if f.is_finite() => Value::Number(number),
        _ => Value::Null,
    }
}
