//! Lenient field access over parsed source JSON.
//!
//! Exports in the wild store numbers as strings and vice versa, so every
//! numeric accessor accepts both.

use serde_json::Value;

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// A trimmed, non-empty string field.
pub(crate) fn text_field(value: &Value, key: &str) -> Option<String> {
    str_field(value, key)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn array_field<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    value.get(key).and_then(Value::as_array)
}

pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn f64_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(as_f64)
}

pub(crate) fn i64_field(value: &Value, key: &str) -> Option<i64> {
    value.get(key).and_then(as_i64)
}

pub(crate) fn u32_field(value: &Value, key: &str) -> Option<u32> {
    i64_field(value, key).and_then(|n| u32::try_from(n).ok())
}

pub(crate) fn usize_field(value: &Value, key: &str) -> Option<usize> {
    i64_field(value, key).and_then(|n| usize::try_from(n).ok())
}

pub(crate) fn bool_field(value: &Value, key: &str) -> bool {
    match value.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        Some(Value::String(s)) => s == "true" || s == "1",
        _ => false,
    }
}

/// A scalar rendered as text, for ids that may be numbers or strings.
pub(crate) fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
