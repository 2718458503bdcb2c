//! Tolerant field decoders.
//!
//! The backend serializes pandas values, so a count may arrive as `42`,
//! `42.0`, `"42"`, `null`, or `NaN` rendered as a string. These decoders
//! accept any JSON value and yield `None` for anything that is not a
//! usable scalar, so a single odd field never fails a whole response.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Interprets a JSON value as a finite `f64`.
#[must_use]
pub fn value_as_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Interprets a JSON value as a non-negative integer, rounding floats.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn value_as_u64(value: &Value) -> Option<u64> {
    if let Value::Number(n) = value
        && let Some(int) = n.as_u64()
    {
        return Some(int);
    }
    let number = value_as_f64(value)?;
    if number < 0.0 {
        return None;
    }
    Some(number.round() as u64)
}

/// Decodes an optional `f64`.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

/// Decodes an optional `u64`.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_u64))
}

/// Decodes an optional `u32`.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn opt_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_as_u64)
        .and_then(|v| u32::try_from(v).ok()))
}

/// Decodes an optional string, stringifying scalar numbers and booleans.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Decodes a list of strings, skipping non-string items.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Decodes an optional list item by item, dropping items that do not
/// decode as `T`.
///
/// A missing or `null` field is `None`.
///
/// # Errors
///
/// Fails if the field is present but is not a list.
pub fn opt_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(D::Error::custom(format!("expected a list, found {other}")));
        }
    };
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| T::deserialize(item).ok())
        .collect();
    if decoded.len() < total {
        log::warn!("Dropped {} malformed list item(s) of {total}", total - decoded.len());
    }
    Ok(Some(decoded))
}
