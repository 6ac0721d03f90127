//! Column vocabulary and column-list validation

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{InventoryError, Result};
use crate::sanitize::sanitize;

/// Column names reserved for system-managed fields, present on every entity
/// store and never editable as custom columns.
pub const SYSTEM_COLUMNS: &[&str] = &[
    "asset_tag",
    "created_at",
    "created_by",
    "updated_at",
    "updated_by",
    "status",
];

/// Column types accepted from callers, mapped 1:1 to Postgres types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Number,
    Date,
    Boolean,
}

impl ColumnType {
    /// Caller-facing name of the type
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Boolean => "boolean",
        }
    }

    /// Storage-level type used in generated DDL
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "double precision",
            Self::Date => "date",
            Self::Boolean => "boolean",
        }
    }

    /// Parse a caller-supplied type name; anything outside the vocabulary is
    /// rejected, not coerced.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "number" => Some(Self::Number),
            "date" => Some(Self::Date),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Reverse-map a `information_schema.columns.data_type` value
    pub(crate) fn from_data_type(data_type: &str) -> Option<Self> {
        match data_type.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "double precision" => Some(Self::Number),
            "date" => Some(Self::Date),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }
}

/// A validated custom column: sanitized name plus vocabulary type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A raw column entry as submitted by the UI; rows may be partially filled
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnSpec {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub column_type: Option<String>,
}

/// Validate column entries for table creation.
///
/// Entries failing name sanitization or the type vocabulary are dropped from
/// the set rather than failing the call, tolerating partially-filled column
/// rows from the UI; every drop is logged.
pub fn sanitize_columns(specs: &[ColumnSpec]) -> Vec<ColumnDef> {
    let mut columns = Vec::with_capacity(specs.len());

    for spec in specs {
        let name = spec.name.as_deref().and_then(sanitize);
        let column_type = spec.column_type.as_deref().and_then(ColumnType::parse);

        match (name, column_type) {
            (Some(name), Some(column_type)) if !is_system_column(&name) => {
                columns.push(ColumnDef { name, column_type });
            }
            _ => {
                warn!(
                    "Dropping invalid column entry (name: {:?}, type: {:?})",
                    spec.name, spec.column_type
                );
            }
        }
    }

    columns
}

/// Validate column entries for structure evolution.
///
/// Rows with an empty name are skipped (the UI submits blank trailing rows),
/// but a named row with a type outside the vocabulary fails the whole call.
/// A missing type defaults to text.
pub fn parse_columns_strict(specs: &[ColumnSpec]) -> Result<Vec<ColumnDef>> {
    let mut columns = Vec::with_capacity(specs.len());

    for spec in specs {
        let Some(raw_name) = spec.name.as_deref().filter(|n| !n.trim().is_empty()) else {
            continue;
        };

        let name = sanitize(raw_name)
            .ok_or_else(|| InventoryError::InvalidIdentifier(raw_name.to_string()))?;

        if is_system_column(&name) {
            return Err(InventoryError::InvalidInput(format!(
                "column \"{}\" is system-managed",
                name
            )));
        }

        let column_type = match spec.column_type.as_deref() {
            None => ColumnType::Text,
            Some(raw) => ColumnType::parse(raw).ok_or_else(|| {
                InventoryError::InvalidInput(format!("unsupported column type {:?}", raw))
            })?,
        };

        columns.push(ColumnDef { name, column_type });
    }

    Ok(columns)
}

pub(crate) fn is_system_column(name: &str) -> bool {
    SYSTEM_COLUMNS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, column_type: &str) -> ColumnSpec {
        ColumnSpec {
            name: Some(name.to_string()),
            column_type: Some(column_type.to_string()),
        }
    }

    #[test]
    fn test_type_vocabulary_round_trip() {
        for (raw, sql) in [
            ("text", "text"),
            ("number", "double precision"),
            ("date", "date"),
            ("Boolean", "boolean"),
        ] {
            let parsed = ColumnType::parse(raw).unwrap();
            assert_eq!(parsed.as_sql(), sql);
            assert_eq!(ColumnType::from_data_type(sql), Some(parsed));
        }

        assert_eq!(ColumnType::parse("varchar"), None);
        assert_eq!(ColumnType::parse("jsonb"), None);
    }

    #[test]
    fn test_sanitize_columns_drops_invalid_entries() {
        let specs = vec![
            spec("Serial No", "text"),
            spec("warranty", "jsonb"),
            ColumnSpec::default(),
            spec("!!!", "text"),
            spec("price", "number"),
        ];

        let columns = sanitize_columns(&specs);
        assert_eq!(
            columns,
            vec![
                ColumnDef::new("serial_no", ColumnType::Text),
                ColumnDef::new("price", ColumnType::Number),
            ]
        );
    }

    #[test]
    fn test_sanitize_columns_rejects_system_names() {
        let columns = sanitize_columns(&[spec("asset_tag", "text"), spec("ram", "number")]);
        assert_eq!(columns, vec![ColumnDef::new("ram", ColumnType::Number)]);
    }

    #[test]
    fn test_parse_columns_strict_fails_on_bad_type() {
        let err = parse_columns_strict(&[spec("price", "money")]).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidInput(_)));
    }

    #[test]
    fn test_parse_columns_strict_skips_blank_rows_and_defaults_type() {
        let columns = parse_columns_strict(&[
            ColumnSpec {
                name: Some("  ".to_string()),
                column_type: None,
            },
            ColumnSpec {
                name: Some("notes".to_string()),
                column_type: None,
            },
        ])
        .unwrap();

        assert_eq!(columns, vec![ColumnDef::new("notes", ColumnType::Text)]);
    }
}
