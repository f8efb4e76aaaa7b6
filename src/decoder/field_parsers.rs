//! Lenient field coercions
//!
//! Every parser here returns its documented default instead of an error.

use super::rules::FieldKind;
use crate::constants::BOOLEAN_TRUE_LITERAL;
use crate::models::Value;
use tracing::trace;

/// Parse an integer field, defaulting to 0
///
/// A decimal value is truncated toward zero, so an export that writes
/// counts as `3.0` still decodes to 3.
pub fn parse_integer(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return value;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => value.trunc() as i64,
        _ => {
            if !trimmed.is_empty() {
                trace!("integer default applied for '{}'", trimmed);
            }
            0
        }
    }
}

/// Parse a floating point field, defaulting to 0.0
pub fn parse_float(raw: &str) -> f64 {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            if !trimmed.is_empty() {
                trace!("float default applied for '{}'", trimmed);
            }
            0.0
        }
    }
}

/// True only when the trimmed, lower-cased value is "true"
pub fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case(BOOLEAN_TRUE_LITERAL)
}

/// Trimmed text, or null when empty
pub fn parse_text(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::Text(trimmed.to_string())
    }
}

pub fn coerce(raw: &str, kind: FieldKind) -> Value {
    match kind {
        FieldKind::Integer => Value::Int(parse_integer(raw)),
        FieldKind::Float => Value::Float(parse_float(raw)),
        FieldKind::Boolean => Value::Bool(parse_flag(raw)),
        FieldKind::Text => parse_text(raw),
    }
}
