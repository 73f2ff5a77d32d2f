//! Assertion helpers shared by the compositor and the router.
//!
//! Every helper fails with an [`ErrorKind::InvalidInput`](crate::ErrorKind)
//! error (or [`CompositorError::FieldAlreadySet`] for write-once guards) and
//! never coerces silently.

use crate::error::{CompositorError, CompositorResult};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

/// Cast a JSON number or numeric string to an integer that is `> 0`
pub fn cast_positive_int(value: &Value, name: &str) -> CompositorResult<u64> {
    let n = cast_int(value, name)?;
    if n <= 0 {
        return Err(CompositorError::InvalidInput(format!(
            "{name} must be a positive integer, got {n}"
        )));
    }
    Ok(n as u64)
}

/// Cast a JSON number or numeric string to an integer that is `>= 0`
pub fn cast_non_negative_int(value: &Value, name: &str) -> CompositorResult<u64> {
    let n = cast_int(value, name)?;
    if n < 0 {
        return Err(CompositorError::InvalidInput(format!(
            "{name} must be a non-negative integer, got {n}"
        )));
    }
    Ok(n as u64)
}

fn cast_int(value: &Value, name: &str) -> CompositorResult<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        CompositorError::InvalidInput(format!("{name} must be an integer, got {value}"))
    })
}

/// Assert `value` is one of `allowed`
pub fn expect_in<T>(value: &T, allowed: &[T], name: &str) -> CompositorResult<()>
where
    T: PartialEq + Display,
{
    if allowed.contains(value) {
        return Ok(());
    }
    let options = allowed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Err(CompositorError::InvalidInput(format!(
        "Invalid {name}: {value} (expected one of {options})"
    )))
}

/// Assert `value` is a JSON array
pub fn expect_array<'a>(value: &'a Value, name: &str) -> CompositorResult<&'a Vec<Value>> {
    value.as_array().ok_or_else(|| {
        CompositorError::InvalidInput(format!("Expected a list for {name}, got {value}"))
    })
}

/// Assert `value` is a JSON object
pub fn expect_object<'a>(
    value: &'a Value,
    name: &str,
) -> CompositorResult<&'a serde_json::Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        CompositorError::InvalidInput(format!("Expected an object for {name}, got {value}"))
    })
}

/// Assert `value` is a JSON string
pub fn expect_str<'a>(value: &'a Value, name: &str) -> CompositorResult<&'a str> {
    value.as_str().ok_or_else(|| {
        CompositorError::InvalidInput(format!("Expected a string for {name}, got {value}"))
    })
}

/// Assert `min <= len <= max`
pub fn expect_len_range(len: usize, min: usize, max: usize, name: &str) -> CompositorResult<()> {
    if len < min || len > max {
        return Err(CompositorError::InvalidInput(format!(
            "Expected {name} to have between {min} and {max} elements, got {len}"
        )));
    }
    Ok(())
}

/// Assert exactly one of the named optional fields is present and return its name
pub fn exactly_one_of<'a>(fields: &[(&'a str, bool)], name: &str) -> CompositorResult<&'a str> {
    let mut present = fields.iter().filter(|(_, is_set)| *is_set);
    match (present.next(), present.next()) {
        (Some((field, _)), None) => Ok(*field),
        _ => {
            let names = fields
                .iter()
                .map(|(field, _)| *field)
                .collect::<Vec<_>>()
                .join(", ");
            Err(CompositorError::InvalidInput(format!(
                "{name} requires exactly one of: {names}"
            )))
        }
    }
}

/// Assert `name` is a plain SQL identifier
pub fn expect_identifier(name: &str, what: &str) -> CompositorResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid {
        return Err(CompositorError::InvalidInput(format!(
            "Invalid {what} name: {name:?}"
        )));
    }
    Ok(())
}

/// Write-once guard for an optional builder field
pub fn set_once<T>(slot: &mut Option<T>, value: T, field: &'static str) -> CompositorResult<()> {
    if slot.is_some() {
        return Err(CompositorError::FieldAlreadySet(field));
    }
    *slot = Some(value);
    Ok(())
}

/// Write-once guard for one level of a nested map path.
///
/// Returns a mutable reference to the stored value so callers can descend
/// into the next level.
pub fn insert_once<'m, K, V>(
    map: &'m mut HashMap<K, V>,
    key: K,
    value: V,
    path: &str,
) -> CompositorResult<&'m mut V>
where
    K: Eq + Hash + Display,
{
    use std::collections::hash_map::Entry;

    match map.entry(key) {
        Entry::Occupied(entry) => Err(CompositorError::InvalidInput(format!(
            "{path} {} is already registered",
            entry.key()
        ))),
        Entry::Vacant(entry) => Ok(entry.insert(value)),
    }
}
