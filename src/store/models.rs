//! Record and envelope types exchanged with the record store

use super::error::StoreError;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored record: a flat JSON object keyed by stored field names
pub type Record = Map<String, Value>;

/// Response envelope used by the record store.
///
/// `data` carries the record (or list of records) on success; `error` is a
/// message or an object with a `message` field on failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Envelope {
    /// Successful envelope carrying `data`
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed envelope carrying a message
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(Value::String(message.into())),
        }
    }

    /// Human-readable error message, if the envelope carries one
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(error_text)
    }

    /// Unwrap the payload, turning `success: false` into [`StoreError::Rejected`]
    pub fn into_data(self) -> Result<Value, StoreError> {
        if self.success {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(StoreError::Rejected(
                self.error_message()
                    .unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

fn error_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

/// Interpret a response body.
///
/// Bodies shaped like an [`Envelope`] (an object with a boolean `success`) are
/// unwrapped; any other JSON is taken as the payload itself. An empty body is
/// `null`.
pub fn parse_body(body: &str) -> Result<Value, StoreError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    let value: Value =
        serde_json::from_str(body).map_err(|e| StoreError::Decode(e.to_string()))?;

    let is_envelope = value
        .as_object()
        .map(|obj| obj.get("success").is_some_and(Value::is_boolean))
        .unwrap_or(false);

    if is_envelope {
        let envelope: Envelope =
            serde_json::from_value(value).map_err(|e| StoreError::Decode(e.to_string()))?;
        envelope.into_data()
    } else {
        Ok(value)
    }
}

/// Extract a record from a payload
pub fn expect_record(value: Value) -> Result<Record, StoreError> {
    match value {
        Value::Object(record) => Ok(record),
        other => Err(StoreError::Decode(format!(
            "expected a record object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Extract a list of records from a payload.
///
/// Non-object entries are dropped with a warning rather than failing the list.
pub fn expect_records(value: Value) -> Result<Vec<Record>, StoreError> {
    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) => Some(record),
                other => {
                    tracing::warn!(kind = json_kind(&other), "Skipping non-object list entry");
                    None
                }
            })
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(StoreError::Decode(format!(
            "expected a list of records, got {}",
            json_kind(&other)
        ))),
    }
}

/// String form of a record's `id`; numeric ids from legacy data are accepted
pub fn record_id(record: &Record) -> Option<String> {
    match record.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Current time as an ISO-8601 timestamp, the format of `createdAt`/`updatedAt`
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_envelope_success() {
        let data = parse_body(r#"{"success":true,"data":{"id":"t1"}}"#).unwrap();
        assert_eq!(data, json!({"id": "t1"}));
    }

    #[test]
    fn test_parse_envelope_failure_message() {
        let err = parse_body(r#"{"success":false,"error":"Table locked"}"#).unwrap_err();
        assert!(matches!(err, StoreError::Rejected(ref m) if m == "Table locked"));

        let err = parse_body(r#"{"success":false,"error":{"message":"nested"}}"#).unwrap_err();
        assert!(matches!(err, StoreError::Rejected(ref m) if m == "nested"));
    }

    #[test]
    fn test_parse_plain_body_is_payload() {
        let data = parse_body(r#"[{"id":"a"},{"id":"b"}]"#).unwrap();
        assert_eq!(expect_records(data).unwrap().len(), 2);

        // `success` that is not a boolean is just a field of the record
        let data = parse_body(r#"{"id":"x","success":"yes"}"#).unwrap();
        assert_eq!(record_id(&expect_record(data).unwrap()).as_deref(), Some("x"));
    }

    #[test]
    fn test_parse_empty_and_invalid_body() {
        assert_eq!(parse_body("  ").unwrap(), Value::Null);
        assert!(matches!(parse_body("<html>"), Err(StoreError::Decode(_))));
    }

    #[test]
    fn test_expect_records_skips_non_objects() {
        let records = expect_records(json!([{"id": "a"}, 3, "x", {"id": "b"}])).unwrap();
        assert_eq!(records.len(), 2);
        assert!(expect_records(json!({"id": "a"})).is_err());
    }

    #[test]
    fn test_record_id_forms() {
        let rec = expect_record(json!({"id": 42})).unwrap();
        assert_eq!(record_id(&rec).as_deref(), Some("42"));
        let rec = expect_record(json!({"id": ""})).unwrap();
        assert_eq!(record_id(&rec), None);
        let rec = expect_record(json!({"title": "no id"})).unwrap();
        assert_eq!(record_id(&rec), None);
    }
}
