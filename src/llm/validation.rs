use serde_json::Value;
use thiserror::Error;

use crate::models::FirmRecord;

/// Ways a model response can fail to have the expected shape
#[derive(Debug, Error, PartialEq)]
pub enum ResponseError {
    #[error("response contains no parseable JSON")]
    NoJson,

    #[error("response is not a JSON array of records")]
    NotAnArray,

    #[error("expected {expected} records, got {found}")]
    CountMismatch { expected: usize, found: usize },

    #[error("record {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("record {index} does not echo its sequence or firm")]
    MissingEcho { index: usize },

    #[error("record {index} answers for {found}, expected {expected}")]
    OrderMismatch {
        index: usize,
        expected: String,
        found: String,
    },
}

/// Keys a model may wrap the record array under
const ARRAY_WRAPPERS: [&str; 6] = ["records", "results", "scores", "items", "data", "output"];

/// Parse JSON out of model text that may carry fences or prose around it
pub fn extract_json(text: &str) -> Result<Value, ResponseError> {
    let trimmed = strip_fences(text.trim());
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find(['{', '[']).ok_or(ResponseError::NoJson)?;
    let closer = if trimmed[start..].starts_with('[') { ']' } else { '}' };
    let end = trimmed.rfind(closer).ok_or(ResponseError::NoJson)?;
    if end <= start {
        return Err(ResponseError::NoJson);
    }

    serde_json::from_str(&trimmed[start..=end]).map_err(|_| ResponseError::NoJson)
}

/// Pull the list of per-record objects out of a reply.
///
/// Accepts a bare array, an array under one of the usual wrapper keys, or an
/// object whose values are all objects (records keyed by sequence).
pub fn record_array(value: Value) -> Result<Vec<Value>, ResponseError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            if let Some(items) = ARRAY_WRAPPERS.iter().find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            }) {
                return Ok(items);
            }
            if !map.is_empty() && map.values().all(Value::is_object) {
                return Ok(map.into_iter().map(|(_, v)| v).collect());
            }
            Err(ResponseError::NotAnArray)
        }
        _ => Err(ResponseError::NotAnArray),
    }
}

/// Check a batch response against the chunk it answers.
///
/// The reply must hold exactly one object per input record, in input order,
/// each echoing its record's `sequence` (or `firm`). Anything else rejects
/// the whole response.
pub fn validate_batch_response(value: Value, chunk: &[FirmRecord]) -> Result<Vec<Value>, ResponseError> {
    let items = record_array(value)?;

    if items.len() != chunk.len() {
        return Err(ResponseError::CountMismatch {
            expected: chunk.len(),
            found: items.len(),
        });
    }

    for (index, (item, record)) in items.iter().zip(chunk).enumerate() {
        if !item.is_object() {
            return Err(ResponseError::NotAnObject { index });
        }
        check_echo(index, item, record)?;
    }

    Ok(items)
}

/// Read a `sequence` value that a model may send as a number or a string
pub fn echoed_sequence(item: &Value) -> Option<usize> {
    match item.get("sequence")? {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn check_echo(index: usize, item: &Value, record: &FirmRecord) -> Result<(), ResponseError> {
    if let Some(sequence) = echoed_sequence(item) {
        if sequence != record.sequence {
            return Err(ResponseError::OrderMismatch {
                index,
                expected: format!("#{}", record.sequence),
                found: format!("#{}", sequence),
            });
        }
        return Ok(());
    }

    match item.get("firm").and_then(Value::as_str).map(str::trim) {
        Some(firm) if firm.eq_ignore_ascii_case(record.firm.trim()) => Ok(()),
        Some(firm) => Err(ResponseError::OrderMismatch {
            index,
            expected: record.firm.clone(),
            found: firm.to_string(),
        }),
        None => Err(ResponseError::MissingEcho { index }),
    }
}

fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_plain_and_fenced_json() {
        assert_eq!(extract_json("[1, 2]").unwrap(), json!([1, 2]));
        assert_eq!(
            extract_json("```json\n{\"industry\": \"Water\"}\n```").unwrap(),
            json!({"industry": "Water"})
        );
    }

    #[test]
    fn test_extract_json_from_prose() {
        let text = "Sure! Here are the records:\n[{\"industry\": null}]\nLet me know.";
        assert_eq!(extract_json(text).unwrap(), json!([{"industry": null}]));
        assert_eq!(extract_json("no data here"), Err(ResponseError::NoJson));
    }

    fn chunk() -> Vec<FirmRecord> {
        vec![FirmRecord::new(1, "Acme Co"), FirmRecord::new(2, "Beta LLC")]
    }

    #[test]
    fn test_validate_accepts_wrapped_array() {
        let value = json!({"records": [
            {"sequence": 1, "industry": "Water"},
            {"sequence": "2", "industry": null}
        ]});
        let items = validate_batch_response(value, &chunk()).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_validate_accepts_firm_echo() {
        let value = json!([{"firm": "acme co"}, {"firm": "Beta LLC "}]);
        assert!(validate_batch_response(value, &chunk()).is_ok());
    }

    #[test]
    fn test_validate_rejects_count_mismatch() {
        let value = json!([{"sequence": 1}, {"sequence": 2}]);
        let three = vec![
            FirmRecord::new(1, "Acme Co"),
            FirmRecord::new(2, "Beta LLC"),
            FirmRecord::new(3, "Gamma Inc"),
        ];
        assert_eq!(
            validate_batch_response(value, &three),
            Err(ResponseError::CountMismatch { expected: 3, found: 2 })
        );
    }

    #[test]
    fn test_validate_rejects_reordered_records() {
        let value = json!([{"sequence": 2}, {"sequence": 1}]);
        assert!(matches!(
            validate_batch_response(value, &chunk()),
            Err(ResponseError::OrderMismatch { index: 0, .. })
        ));

        let value = json!([{"firm": "Acme Co"}, {"firm": "Gamma Inc"}]);
        assert!(matches!(
            validate_batch_response(value, &chunk()),
            Err(ResponseError::OrderMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        assert_eq!(
            validate_batch_response(json!({"industry": "Water"}), &chunk()),
            Err(ResponseError::NotAnArray)
        );
        assert_eq!(
            validate_batch_response(json!([{"sequence": 1}, "oops"]), &chunk()),
            Err(ResponseError::NotAnObject { index: 1 })
        );
        assert_eq!(
            validate_batch_response(json!([{"sequence": 1}, {"industry": "Power"}]), &chunk()),
            Err(ResponseError::MissingEcho { index: 1 })
        );
    }

    #[test]
    fn test_record_array_accepts_keyed_objects() {
        let items = record_array(json!({"1": {"lead_score": 40}, "2": {"lead_score": 10}})).unwrap();
        assert_eq!(items.len(), 2);
    }
}
