//! Inspection of Mix API response payloads
//!
//! Mix reports some failures inside a 200 response: a top-level
//! `"status": "error"`, non-empty `error`/`errors` fields, or an expired
//! token flagged as `data[0].error.status == "unauthorized"`.

use serde_json::Value;

const DATA_FIELD: &str = "data";
const ERROR_FIELDS: [&str; 2] = ["error", "errors"];

/// First element of a non-empty `data` array, or `data` itself when it is an object
fn first_data_entry(payload: &Value) -> Option<&Value> {
    match payload.get(DATA_FIELD)? {
        Value::Array(items) => items.first(),
        obj @ Value::Object(_) => Some(obj),
        _ => None,
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

fn error_fields(value: &Value) -> Option<String> {
    ERROR_FIELDS.iter().find_map(|field| {
        value
            .get(field)
            .filter(|v| is_present(v))
            .map(|v| format!("{}: {}", field, v))
    })
}

/// Whether the payload carries the in-band "token expired" signal.
pub fn signals_unauthorized(payload: &Value) -> bool {
    first_data_entry(payload)
        .and_then(|entry| entry.get("error"))
        .and_then(|error| error.get("status"))
        .and_then(Value::as_str)
        .is_some_and(|status| status.eq_ignore_ascii_case("unauthorized"))
}

/// Describe the first error reported in the payload, if any.
pub fn error_detail(payload: &Value) -> Option<String> {
    if payload.get("status").and_then(Value::as_str) == Some("error") {
        return Some(format!("status: error, payload: {}", payload));
    }

    if let Some(detail) = error_fields(payload) {
        return Some(detail);
    }

    let entry = first_data_entry(payload)?;
    if let Some(detail) = error_fields(entry) {
        return Some(detail);
    }
    entry.get("response").and_then(error_fields)
}

/// Reduce the `data` field of a payload:
/// a single-element array yields that element, an empty array yields `Null`,
/// larger arrays and objects are returned as they are. Payloads without a
/// `data` field are returned unchanged.
pub fn unwrap_data(payload: Value) -> Value {
    let Value::Object(mut map) = payload else {
        return payload;
    };
    match map.remove(DATA_FIELD) {
        None => Value::Object(map),
        Some(Value::Array(mut items)) => match items.len() {
            0 => Value::Null,
            1 => items.remove(0),
            _ => Value::Array(items),
        },
        Some(other) => other,
    }
}
