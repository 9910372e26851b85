//! Strict JSON parsing and record conversion

use crate::error::StreamError;
use arhiv_domain::Record;
use serde_json::{Map, Value};

/// Default key of the records collection
pub const RECORDS_KEY: &str = "records";

/// Convert a JSON object into a record.
///
/// Only string values are captured. Numbers, booleans, null and nested
/// structures are left out in every parsing tier, so a partially received
/// record can only gain fields as more text arrives.
pub(crate) fn record_from_object(object: &Map<String, Value>) -> Record {
    object
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}

/// Convert a JSON value into a record, if it is an object
pub fn record_from_value(value: &Value) -> Option<Record> {
    value.as_object().map(record_from_object)
}

/// Convert an array of JSON values, skipping anything that is not an object
pub fn records_from_values(values: &[Value]) -> Vec<Record> {
    values.iter().filter_map(record_from_value).collect()
}

/// Strip a surrounding markdown code fence, if present
///
/// Models sometimes wrap JSON in ```` ```json ... ``` ```` despite being told
/// not to.
pub(crate) fn strip_code_fence(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let rest = trimmed.strip_prefix("```")?;

    // Skip the rest of the opening line (language tag)
    let body_start = rest.find('\n')? + 1;
    let body = &rest[body_start..];
    let body = body.trim_end();
    Some(body.strip_suffix("```").unwrap_or(body).trim())
}

/// Strict parse of a whole document, tolerating a markdown fence
pub(crate) fn strict_parse(text: &str) -> Result<Value, serde_json::Error> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(e) => match strip_code_fence(text) {
            Some(inner) => serde_json::from_str(inner),
            None => Err(e),
        },
    }
}

/// Pull the records collection out of a parsed document.
///
/// An object yields the array under `key` (a missing key yields no records);
/// a top-level array is itself the collection.
pub(crate) fn records_in_document(document: &Value, key: &str) -> Result<Vec<Record>, StreamError> {
    match document {
        Value::Object(object) => match object.get(key) {
            Some(Value::Array(items)) => Ok(records_from_values(items)),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(StreamError::InvalidFormat(format!(
                "'{}' is not an array",
                key
            ))),
        },
        Value::Array(items) => Ok(records_from_values(items)),
        _ => Err(StreamError::InvalidFormat(
            "Expected a JSON object or array".to_string(),
        )),
    }
}

/// Authoritative strict parse of a finished model response.
///
/// Used on terminal completion; any syntax error is reported rather than
/// approximated.
///
/// # Examples
///
/// ```
/// use arhiv_stream::parse_document;
///
/// let records = parse_document(r#"{"records":[{"a":"1"}]}"#).unwrap();
/// assert_eq!(records[0].get("a"), Some("1"));
/// assert!(parse_document(r#"{"records":[{"a":"1"}"#).is_err());
/// ```
pub fn parse_document(text: &str) -> Result<Vec<Record>, StreamError> {
    parse_document_with_key(text, RECORDS_KEY)
}

/// [`parse_document`] with a custom records key
pub fn parse_document_with_key(text: &str, key: &str) -> Result<Vec<Record>, StreamError> {
    let document = strict_parse(text)?;
    records_in_document(&document, key)
}
