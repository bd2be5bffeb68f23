// Request body helpers.
//
// Bodies are read as raw bytes and parsed here rather than through
// `Json<T>`, so that malformed input gets the API's own `{"error"}` shape
// and integer fields may arrive as numbers or numeric strings.

use axum::body::Bytes;
use serde_json::{Map, Value};

use linecount_core::coerce;

use super::error::ApiError;

pub type Fields = Map<String, Value>;

/// Parse a JSON object body. An empty body counts as `{}`.
pub fn object(body: &Bytes) -> Result<Fields, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Fields::new());
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(ApiError::bad_request("invalid JSON: expected an object")),
        Err(e) => Err(ApiError::bad_request(format!("invalid JSON: {e}"))),
    }
}

/// Names from `required` that are absent from `fields`.
pub fn missing<'a>(fields: &Fields, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|key| !fields.contains_key(*key))
        .collect()
}

/// Required integer field.
pub fn int(fields: &Fields, key: &str) -> Result<i64, ApiError> {
    fields
        .get(key)
        .and_then(coerce::int)
        .ok_or_else(|| ApiError::bad_request(format!("{key} must be an integer")))
}

/// Integer field where absent or `null` means 0.
pub fn int_or_zero(fields: &Fields, key: &str) -> Result<i64, ApiError> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => coerce::int(value)
            .ok_or_else(|| ApiError::bad_request(format!("invalid JSON: {key} must be an integer"))),
    }
}

/// Trimmed string field; absent or `null` is empty.
pub fn text(fields: &Fields, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Optional string field; absent, `null` and non-strings are `None`.
pub fn opt_text<'a>(fields: &'a Fields, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}
