//! Purpose: Convert loosely-typed configuration values into strict primitives.
//! Exports: `coerce_u32`, `coerce_bool`.
//! Role: Leaf helpers for the resolution engine; pure functions, no diagnostics.
//! Invariants: Floats must be integral and in range; nothing is truncated silently.
//! Invariants: Booleans accept only 0 or 1 from numeric input; there is no truthiness.
//! Invariants: Byte input is trimmed, tried as text, then decoded as nested JSON.

use crate::core::value::ConfigValue;
use bstr::ByteSlice;

pub fn coerce_u32(value: &ConfigValue) -> Option<u32> {
    match value {
        ConfigValue::UInt(value) => u32::try_from(*value).ok(),
        ConfigValue::Int(value) => u32::try_from(*value).ok(),
        ConfigValue::Float(value) => float_to_u32(*value),
        ConfigValue::Number(number) => {
            if let Some(value) = number.as_i64() {
                u32::try_from(value).ok()
            } else if let Some(value) = number.as_u64() {
                u32::try_from(value).ok()
            } else {
                number.as_f64().and_then(float_to_u32)
            }
        }
        ConfigValue::Text(text) => u32_from_str(text),
        ConfigValue::Bytes(bytes) => u32_from_bytes(bytes),
        _ => None,
    }
}

pub fn coerce_bool(value: &ConfigValue) -> Option<bool> {
    match value {
        ConfigValue::Bool(value) => Some(*value),
        ConfigValue::UInt(value) => bool_from_int(i128::from(*value)),
        ConfigValue::Int(value) => bool_from_int(i128::from(*value)),
        ConfigValue::Float(value) => bool_from_float(*value),
        ConfigValue::Number(number) => match number.as_i64() {
            Some(value) => bool_from_int(i128::from(value)),
            None => number.as_f64().and_then(bool_from_float),
        },
        ConfigValue::Text(text) => bool_from_str(text),
        ConfigValue::Bytes(bytes) => bool_from_bytes(bytes),
        _ => None,
    }
}

fn float_to_u32(value: f64) -> Option<u32> {
    if !value.is_finite() || value < 0.0 || value > f64::from(u32::MAX) || value.trunc() != value {
        return None;
    }
    Some(value as u32)
}

fn u32_from_str(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = trimmed.parse::<u32>() {
        return Some(value);
    }
    trimmed.parse::<f64>().ok().and_then(float_to_u32)
}

fn u32_from_bytes(bytes: &[u8]) -> Option<u32> {
    let trimmed = bytes.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(value) = trimmed.to_str().ok().and_then(u32_from_str) {
        return Some(value);
    }
    let nested: ConfigValue = serde_json::from_slice(trimmed).ok()?;
    coerce_u32(&nested)
}

fn bool_from_int(value: i128) -> Option<bool> {
    match value {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}

fn bool_from_float(value: f64) -> Option<bool> {
    if value == 0.0 {
        Some(false)
    } else if value == 1.0 {
        Some(true)
    } else {
        None
    }
}

fn bool_from_str(text: &str) -> Option<bool> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return Some(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Some(false);
    }
    u32_from_str(trimmed).and_then(|value| bool_from_int(i128::from(value)))
}

fn bool_from_bytes(bytes: &[u8]) -> Option<bool> {
    let trimmed = bytes.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(value) = trimmed.to_str().ok().and_then(bool_from_str) {
        return Some(value);
    }
    let nested: ConfigValue = serde_json::from_slice(trimmed).ok()?;
    coerce_bool(&nested)
}
