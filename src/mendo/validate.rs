//! Request body validation helpers.
//!
//! Create and patch bodies arrive as raw JSON values so a handler can tell
//! an absent field (leave unchanged) from an explicit `null` (clear). Each
//! helper validates one field shape and reports a caller-fixable 400 naming
//! the field.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::error::ApiError;

pub fn as_record<'a>(
    value: &'a Value,
    field: &str,
) -> Result<&'a Map<String, Value>, ApiError> {
    value
        .as_object()
        .ok_or_else(|| ApiError::bad_request(format!("Field '{field}' must be an object")))
}

pub fn as_string(value: Option<&Value>, field: &str) -> Result<String, ApiError> {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request(format!("Field '{field}' must be a string")))
}

pub fn as_non_empty_string(value: Option<&Value>, field: &str) -> Result<String, ApiError> {
    let parsed = as_string(value, field)?.trim().to_string();
    if parsed.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Field '{field}' cannot be empty"
        )));
    }
    Ok(parsed)
}

pub fn as_optional_string(value: Option<&Value>, field: &str) -> Result<Option<String>, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(_) => Ok(Some(as_string(value, field)?.trim().to_string())),
    }
}

pub fn as_number(value: Option<&Value>, field: &str) -> Result<f64, ApiError> {
    if let Some(number) = value.and_then(Value::as_f64) {
        return Ok(number);
    }

    if let Some(text) = value.and_then(Value::as_str) {
        if !text.trim().is_empty() {
            if let Ok(parsed) = text.trim().parse::<f64>() {
                if parsed.is_finite() {
                    return Ok(parsed);
                }
            }
        }
    }

    Err(ApiError::bad_request(format!(
        "Field '{field}' must be a valid number"
    )))
}

pub fn as_optional_number(value: Option<&Value>, field: &str) -> Result<Option<f64>, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.is_empty() => Ok(None),
        Some(_) => Ok(Some(as_number(value, field)?)),
    }
}

pub fn as_boolean(value: Option<&Value>, field: &str) -> Result<bool, ApiError> {
    value
        .and_then(Value::as_bool)
        .ok_or_else(|| ApiError::bad_request(format!("Field '{field}' must be a boolean")))
}

pub fn as_optional_boolean(value: Option<&Value>, field: &str) -> Result<Option<bool>, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(_) => Ok(Some(as_boolean(value, field)?)),
    }
}

pub fn as_datetime(value: Option<&Value>, field: &str) -> Result<DateTime<Utc>, ApiError> {
    value
        .and_then(Value::as_str)
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok_or_else(|| ApiError::bad_request(format!("Field '{field}' must be a valid datetime")))
}

pub fn as_optional_datetime(
    value: Option<&Value>,
    field: &str,
) -> Result<Option<DateTime<Utc>>, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.is_empty() => Ok(None),
        Some(_) => Ok(Some(as_datetime(value, field)?)),
    }
}
