//! Lenient field readers for stored records
//!
//! Stored records are loosely typed: numbers arrive as strings, lists as
//! JSON-encoded strings or real arrays, ids as numbers on older data. These
//! readers normalize one field each and return `None` for anything they cannot
//! make sense of, so a single bad field never fails a whole record.

use super::models::Record;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// A record that cannot be decoded at all
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{entity} record has no usable id")]
    MissingId { entity: &'static str },

    #[error("{entity} record is not a JSON object")]
    NotAnObject { entity: &'static str },
}

/// Non-empty text. Numbers and booleans are rendered as text.
pub fn text(record: &Record, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reference to another record: a non-empty string or a number
pub fn reference(record: &Record, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Finite number; numeric strings are parsed
pub fn number(record: &Record, key: &str) -> Option<f64> {
    let parsed = match record.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => match s.trim().parse::<f64>() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!(field = key, value = %s, "Ignoring non-numeric value");
                None
            }
        },
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// Percentage rounded and clamped to 0..=100
pub fn percent(record: &Record, key: &str) -> Option<u8> {
    number(record, key).map(|n| n.round().clamp(0.0, 100.0) as u8)
}

/// Comma-separated text; an array of strings is joined with `,`
pub fn comma_text(record: &Record, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}

/// JSON-encoded text; arrays and objects are encoded
pub fn json_text(record: &Record, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.clone()),
        v @ (Value::Array(_) | Value::Object(_)) => Some(v.to_string()),
        _ => None,
    }
}

/// List of strings stored either as a real array, a JSON-encoded array or a
/// comma-separated string
pub fn string_list(record: &Record, key: &str) -> Vec<String> {
    let items = match record.get(key) {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.starts_with('[') {
                match serde_json::from_str::<Vec<Value>>(trimmed) {
                    Ok(items) => items,
                    Err(e) => {
                        warn!(field = key, "Ignoring malformed JSON list: {}", e);
                        Vec::new()
                    }
                }
            } else {
                return split_comma_list(trimmed);
            }
        }
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

/// Split on `,`, trimming entries and dropping empty ones
pub fn split_comma_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Calendar date in `YYYY-MM-DD`; a full timestamp contributes its date
pub fn date(record: &Record, key: &str) -> Option<NaiveDate> {
    let raw = match record.get(key)? {
        Value::String(s) if !s.trim().is_empty() => s.trim(),
        _ => return None,
    };
    let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()));
    if parsed.is_none() {
        warn!(field = key, value = %raw, "Ignoring malformed date");
    }
    parsed
}

/// ISO-8601 timestamp; a bare date is read as midnight UTC
pub fn timestamp(record: &Record, key: &str) -> Option<DateTime<Utc>> {
    let raw = match record.get(key)? {
        Value::String(s) if !s.trim().is_empty() => s.trim(),
        _ => return None,
    };
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        });
    if parsed.is_none() {
        warn!(field = key, value = %raw, "Ignoring malformed timestamp");
    }
    parsed
}

/// Borrow a JSON value as a record
pub fn as_record<'a>(value: &'a Value, entity: &'static str) -> Result<&'a Record, DecodeError> {
    value.as_object().ok_or(DecodeError::NotAnObject { entity })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_number_accepts_numeric_strings() {
        let r = rec(json!({"a": 4.5, "b": " 12 ", "c": "twelve", "d": null}));
        assert_eq!(number(&r, "a"), Some(4.5));
        assert_eq!(number(&r, "b"), Some(12.0));
        assert_eq!(number(&r, "c"), None);
        assert_eq!(number(&r, "d"), None);
        assert_eq!(number(&r, "missing"), None);
    }

    #[test]
    fn test_percent_is_clamped() {
        let r = rec(json!({"low": -5, "high": "250", "mid": 42.6}));
        assert_eq!(percent(&r, "low"), Some(0));
        assert_eq!(percent(&r, "high"), Some(100));
        assert_eq!(percent(&r, "mid"), Some(43));
    }

    #[test]
    fn test_string_list_shapes() {
        let r = rec(json!({
            "array": ["a", " b ", 3, null],
            "encoded": "[\"x\",\"y\"]",
            "comma": "one, two,,three",
            "broken": "[oops",
        }));
        assert_eq!(string_list(&r, "array"), vec!["a", "b", "3"]);
        assert_eq!(string_list(&r, "encoded"), vec!["x", "y"]);
        assert_eq!(string_list(&r, "comma"), vec!["one", "two", "three"]);
        assert!(string_list(&r, "broken").is_empty());
        assert!(string_list(&r, "missing").is_empty());
    }

    #[test]
    fn test_comma_and_json_text() {
        let r = rec(json!({"tags": ["a", "b"], "subtasks": [{"id": 1}]}));
        assert_eq!(comma_text(&r, "tags").as_deref(), Some("a,b"));
        assert_eq!(json_text(&r, "subtasks").as_deref(), Some("[{\"id\":1}]"));
    }

    #[test]
    fn test_dates_and_timestamps() {
        let r = rec(json!({
            "d": "2024-05-06",
            "ts": "2024-05-06T10:30:00.000Z",
            "bad": "06/05/2024",
        }));
        assert_eq!(date(&r, "d"), NaiveDate::from_ymd_opt(2024, 5, 6));
        assert_eq!(date(&r, "ts"), NaiveDate::from_ymd_opt(2024, 5, 6));
        assert_eq!(date(&r, "bad"), None);
        assert_eq!(
            timestamp(&r, "d").unwrap().to_rfc3339(),
            "2024-05-06T00:00:00+00:00"
        );
        assert!(timestamp(&r, "ts").is_some());
        assert_eq!(timestamp(&r, "bad"), None);
    }

    #[test]
    fn test_reference_trims_and_accepts_numbers() {
        let r = rec(json!({"a": " 7 ", "b": 9, "c": "", "d": null}));
        assert_eq!(reference(&r, "a").as_deref(), Some("7"));
        assert_eq!(reference(&r, "b").as_deref(), Some("9"));
        assert_eq!(reference(&r, "c"), None);
        assert_eq!(reference(&r, "d"), None);
    }
}
