//! Record validation
//!
//! A single pass over an incoming record producing a tagged result: the
//! cleaned field map, or the complete list of field errors so the caller can
//! render them all at once. Nothing here touches storage.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

/// One field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

const MAX_STRING_LEN: usize = 255;

/// Validate and clean an incoming record.
///
/// Strings are trimmed; overlong strings, quote/semicolon characters,
/// non-finite numbers, unparseable date fields, and nested values are all
/// reported. Field names whose lower-cased form contains `date` must carry a
/// parseable date when the value is a string.
pub fn validate_record(input: &Map<String, Value>) -> Result<Map<String, Value>, Vec<FieldError>> {
    let mut cleaned = Map::with_capacity(input.len());
    let mut errors = Vec::new();

    for (field, value) in input {
        match value {
            Value::Null => {
                cleaned.insert(field.clone(), Value::Null);
            }
            Value::String(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    errors.push(FieldError::new(field, "is required"));
                    continue;
                }
                if trimmed.len() > MAX_STRING_LEN {
                    errors.push(FieldError::new(field, "is too long"));
                    continue;
                }
                if trimmed.contains(['\'', '"', ';']) {
                    errors.push(FieldError::new(field, "contains invalid characters"));
                    continue;
                }
                if is_date_field(field) && !parses_as_date(trimmed) {
                    errors.push(FieldError::new(field, "is not a valid date"));
                    continue;
                }
                cleaned.insert(field.clone(), Value::String(trimmed.to_string()));
            }
            Value::Number(n) => {
                if n.as_f64().is_some_and(f64::is_finite) {
                    cleaned.insert(field.clone(), value.clone());
                } else {
                    errors.push(FieldError::new(field, "must be a valid number"));
                }
            }
            Value::Bool(_) => {
                cleaned.insert(field.clone(), value.clone());
            }
            Value::Array(_) | Value::Object(_) => {
                errors.push(FieldError::new(field, "has an unsupported value"));
            }
        }
    }

    if errors.is_empty() {
        Ok(cleaned)
    } else {
        Err(errors)
    }
}

fn is_date_field(field: &str) -> bool {
    field.to_lowercase().contains("date")
}

fn parses_as_date(raw: &str) -> bool {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
        || chrono::DateTime::parse_from_rfc3339(raw).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_valid_record_is_trimmed() {
        let input = as_map(json!({
            "asset_tag": "  LX001  ",
            "price": 1299.5,
            "in_repair": false,
            "notes": null,
        }));

        let cleaned = validate_record(&input).unwrap();
        assert_eq!(cleaned["asset_tag"], json!("LX001"));
        assert_eq!(cleaned["price"], json!(1299.5));
        assert_eq!(cleaned["in_repair"], json!(false));
        assert_eq!(cleaned["notes"], Value::Null);
    }

    #[test]
    fn test_all_errors_reported_at_once() {
        let input = as_map(json!({
            "asset_tag": "",
            "serial": "abc'; DROP TABLE x--",
            "purchase_date": "yesterday",
            "specs": {"ram": 16},
        }));

        let errors = validate_record(&input).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(errors.len(), 4);
        assert!(fields.contains(&"asset_tag"));
        assert!(fields.contains(&"serial"));
        assert!(fields.contains(&"purchase_date"));
        assert!(fields.contains(&"specs"));
    }

    #[test]
    fn test_date_fields_accept_iso_dates() {
        let input = as_map(json!({"purchase_date": "2026-03-14"}));
        let cleaned = validate_record(&input).unwrap();
        assert_eq!(cleaned["purchase_date"], json!("2026-03-14"));

        let input = as_map(json!({"warranty_date": "2027-01-01T00:00:00Z"}));
        assert!(validate_record(&input).is_ok());
    }

    #[test]
    fn test_overlong_string_rejected() {
        let input = as_map(json!({"notes": "x".repeat(256)}));
        let errors = validate_record(&input).unwrap_err();
        assert_eq!(errors[0].message, "is too long");
    }
}
