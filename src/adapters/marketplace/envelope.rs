//! Response envelope helpers
//!
//! Gateway responses are JSON objects carrying `result` (a list of records, or an object
//! wrapping one) and, for paginated list endpoints, a total count in `totalRecord` or
//! `result.totalCount`. Application errors arrive with a 2xx status and an
//! `error_code`/`errorCode` field.

use serde_json::Value;

/// Total record count declared by a paginated response
///
/// Reads `totalRecord` first, then `result.totalCount`. Numeric strings are accepted.
pub fn total_count(body: &Value) -> Option<usize> {
    body.get("totalRecord")
        .and_then(as_count)
        .or_else(|| body.get("result")?.get("totalCount").and_then(as_count))
}

/// Records carried by a response
///
/// A list-valued `result` is returned as-is. An object-valued `result` yields the list
/// stored under `records_key`. Anything else yields no records.
pub fn extract_records(body: &Value, records_key: &str) -> Vec<Value> {
    match body.get("result") {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Object(map)) => match map.get(records_key) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Application-level error reported inside a 2xx body, as `(code, message)`
pub fn api_error(body: &Value) -> Option<(String, String)> {
    let code = body
        .get("error_code")
        .or_else(|| body.get("errorCode"))
        .filter(|v| !v.is_null())?;

    let message = body
        .get("error_message")
        .or_else(|| body.get("errorMessage"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let code = match code {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    Some((code, message))
}

fn as_count(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
