//! Record operations against one entity store
//!
//! Identifiers are sanitized before reaching this module; every value is
//! passed as a bound parameter. Rows travel as JSON objects because the
//! column set is only known at runtime.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, DbBackend, FromQueryResult, JsonValue, Statement, Value};
use serde_json::Map;
use tracing::debug;

use crate::error::{InventoryError, Result};
use crate::sanitize::{item_table, sanitize};
use crate::schema::current_columns;
use crate::types::ColumnType;

/// System fields stamped by the engine; stripped from caller input
const STAMPED_FIELDS: &[&str] = &["created_at", "created_by", "updated_at", "updated_by"];

/// Insert a record, stamping creation and update audit fields
pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
    record: Map<String, JsonValue>,
    actor: &str,
) -> Result<JsonValue> {
    let asset_tag = required_asset_tag(&record)?;
    let types = column_types(conn, identifier).await?;

    let mut fields: Vec<String> = Vec::with_capacity(record.len() + 4);
    let mut values: Vec<Value> = Vec::with_capacity(record.len() + 4);

    for (field, value) in &record {
        if STAMPED_FIELDS.contains(&field.as_str()) {
            continue;
        }
        let field = checked_field(&types, field)?;
        values.push(bind_value(&field, types[&field], value)?);
        fields.push(field);
    }

    let now = Utc::now();
    for (field, value) in [
        ("created_at", Value::from(now)),
        ("created_by", Value::from(actor)),
        ("updated_at", Value::from(now)),
        ("updated_by", Value::from(actor)),
    ] {
        fields.push(field.to_string());
        values.push(value);
    }

    let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("${}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        item_table(identifier),
        quote_fields(&fields),
        placeholders.join(", ")
    );

    let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);
    let row = JsonValue::find_by_statement(stmt)
        .one(conn)
        .await
        .map_err(|e| duplicate_asset_tag(e, &asset_tag))?
        .ok_or_else(|| InventoryError::Storage(sea_orm::DbErr::RecordNotInserted))?;

    debug!("Inserted {:?} into {:?}", asset_tag, identifier);
    Ok(row)
}

/// Apply a partial update to the record with this asset tag
pub async fn update<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
    asset_tag: &str,
    patch: Map<String, JsonValue>,
    actor: &str,
) -> Result<JsonValue> {
    let types = column_types(conn, identifier).await?;

    let mut assignments: Vec<String> = Vec::with_capacity(patch.len() + 2);
    let mut values: Vec<Value> = Vec::with_capacity(patch.len() + 3);

    for (field, value) in &patch {
        if STAMPED_FIELDS.contains(&field.as_str()) {
            continue;
        }
        let field = checked_field(&types, field)?;
        values.push(bind_value(&field, types[&field], value)?);
        assignments.push(format!("\"{}\" = ${}", field, values.len()));
    }

    for (field, value) in [
        ("updated_at", Value::from(Utc::now())),
        ("updated_by", Value::from(actor)),
    ] {
        values.push(value);
        assignments.push(format!("\"{}\" = ${}", field, values.len()));
    }

    values.push(asset_tag.into());
    let sql = format!(
        "UPDATE {} SET {} WHERE asset_tag = ${} RETURNING *",
        item_table(identifier),
        assignments.join(", "),
        values.len()
    );

    let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);
    let patched_tag = patch
        .get("asset_tag")
        .and_then(JsonValue::as_str)
        .unwrap_or(asset_tag)
        .to_string();

    JsonValue::find_by_statement(stmt)
        .one(conn)
        .await
        .map_err(|e| duplicate_asset_tag(e, &patched_tag))?
        .ok_or_else(|| InventoryError::NotFound(asset_tag.to_string()))
}

/// Delete one record, returning the deleted row for confirmation messaging
pub async fn delete<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
    asset_tag: &str,
) -> Result<JsonValue> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!(
            "DELETE FROM {} WHERE asset_tag = $1 RETURNING *",
            item_table(identifier)
        ),
        [asset_tag.into()],
    );

    JsonValue::find_by_statement(stmt)
        .one(conn)
        .await?
        .ok_or_else(|| InventoryError::NotFound(asset_tag.to_string()))
}

/// All records in the store, newest first
pub async fn list<C: ConnectionTrait>(conn: &C, identifier: &str) -> Result<Vec<JsonValue>> {
    let stmt = Statement::from_string(
        DbBackend::Postgres,
        format!(
            "SELECT * FROM {} ORDER BY created_at DESC",
            item_table(identifier)
        ),
    );

    Ok(JsonValue::find_by_statement(stmt).all(conn).await?)
}

/// Fetch one record by asset tag
pub async fn get_one<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
    asset_tag: &str,
) -> Result<JsonValue> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!(
            "SELECT * FROM {} WHERE asset_tag = $1 LIMIT 1",
            item_table(identifier)
        ),
        [asset_tag.into()],
    );

    JsonValue::find_by_statement(stmt)
        .one(conn)
        .await?
        .ok_or_else(|| InventoryError::NotFound(asset_tag.to_string()))
}

/// Number of records in the store
pub async fn count<C: ConnectionTrait>(conn: &C, identifier: &str) -> Result<u64> {
    let stmt = Statement::from_string(
        DbBackend::Postgres,
        format!("SELECT COUNT(*) AS count FROM {}", item_table(identifier)),
    );

    let row = conn.query_one(stmt).await?;
    match row {
        Some(row) => Ok(row.try_get::<i64>("", "count")? as u64),
        None => Ok(0),
    }
}

/// Generate the next asset tag for a store: upper-cased prefix followed by
/// the zero-padded row count plus one.
pub async fn generate_asset_tag<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
    prefix: &str,
) -> Result<String> {
    let next = count(conn, identifier).await? + 1;
    Ok(format_asset_tag(prefix, next))
}

fn format_asset_tag(prefix: &str, next: u64) -> String {
    format!("{}{:03}", prefix.trim().to_uppercase(), next)
}

/// The store's writable columns: current custom columns plus the text-typed
/// system fields callers may set directly.
async fn column_types<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
) -> Result<HashMap<String, ColumnType>> {
    let mut types: HashMap<String, ColumnType> = current_columns(conn, identifier)
        .await?
        .into_iter()
        .map(|c| (c.name, c.column_type))
        .collect();

    for system in ["asset_tag", "status", "created_by", "updated_by"] {
        types.insert(system.to_string(), ColumnType::Text);
    }

    Ok(types)
}

/// Sanitize a caller-supplied field name and require it to be a writable
/// column of the store, so unknown fields are rejected before reaching
/// storage.
fn checked_field(types: &HashMap<String, ColumnType>, field: &str) -> Result<String> {
    let field = sanitize(field)
        .ok_or_else(|| InventoryError::InvalidIdentifier(field.to_string()))?;

    if !types.contains_key(&field) {
        return Err(InventoryError::InvalidInput(format!(
            "unknown column \"{}\"",
            field
        )));
    }

    Ok(field)
}

fn required_asset_tag(record: &Map<String, JsonValue>) -> Result<String> {
    record
        .get("asset_tag")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| InventoryError::InvalidInput("asset_tag is required".to_string()))
}

/// Convert a JSON field value into a typed bind parameter for its column
fn bind_value(field: &str, column_type: ColumnType, value: &JsonValue) -> Result<Value> {
    match value {
        JsonValue::Null => Ok(match column_type {
            ColumnType::Text => Value::String(None),
            ColumnType::Number => Value::Double(None),
            ColumnType::Date => Value::ChronoDate(None),
            ColumnType::Boolean => Value::Bool(None),
        }),
        JsonValue::String(raw) => match column_type {
            ColumnType::Text => Ok(raw.as_str().into()),
            ColumnType::Number => raw
                .parse::<f64>()
                .map(Value::from)
                .map_err(|_| type_mismatch(field, "a number")),
            ColumnType::Boolean => raw
                .parse::<bool>()
                .map(Value::from)
                .map_err(|_| type_mismatch(field, "a boolean")),
            ColumnType::Date => parse_date(raw)
                .map(Value::from)
                .ok_or_else(|| type_mismatch(field, "a date")),
        },
        JsonValue::Number(n) => match column_type {
            ColumnType::Number => Ok(n
                .as_f64()
                .map(Value::from)
                .unwrap_or(Value::Double(None))),
            ColumnType::Text => Ok(n.to_string().into()),
            _ => Err(type_mismatch(field, column_type.as_str())),
        },
        JsonValue::Bool(b) => match column_type {
            ColumnType::Boolean => Ok((*b).into()),
            ColumnType::Text => Ok(b.to_string().into()),
            _ => Err(type_mismatch(field, column_type.as_str())),
        },
        JsonValue::Array(_) | JsonValue::Object(_) => {
            Err(type_mismatch(field, "a scalar value"))
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn type_mismatch(field: &str, expected: &str) -> InventoryError {
    InventoryError::InvalidInput(format!("{} must be {}", field, expected))
}

fn duplicate_asset_tag(err: sea_orm::DbErr, asset_tag: &str) -> InventoryError {
    match InventoryError::from(err) {
        InventoryError::DuplicateKey(_) => InventoryError::DuplicateKey(format!(
            "asset tag {:?} already exists",
            asset_tag
        )),
        other => other,
    }
}

fn quote_fields(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| format!("\"{}\"", f))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bind_value_typed_conversions() {
        assert_eq!(
            bind_value("price", ColumnType::Number, &json!("12.5")).unwrap(),
            Value::from(12.5)
        );
        assert_eq!(
            bind_value("in_repair", ColumnType::Boolean, &json!(true)).unwrap(),
            Value::from(true)
        );
        assert_eq!(
            bind_value("bought", ColumnType::Date, &json!("2026-02-01")).unwrap(),
            Value::from(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap())
        );
        assert_eq!(
            bind_value("serial", ColumnType::Text, &json!(42)).unwrap(),
            Value::from("42")
        );
    }

    #[test]
    fn test_bind_value_typed_nulls() {
        assert_eq!(
            bind_value("price", ColumnType::Number, &JsonValue::Null).unwrap(),
            Value::Double(None)
        );
        assert_eq!(
            bind_value("serial", ColumnType::Text, &JsonValue::Null).unwrap(),
            Value::String(None)
        );
    }

    #[test]
    fn test_bind_value_rejects_mismatches() {
        assert!(bind_value("price", ColumnType::Number, &json!("twelve")).is_err());
        assert!(bind_value("bought", ColumnType::Date, &json!(true)).is_err());
        assert!(bind_value("specs", ColumnType::Text, &json!({"ram": 16})).is_err());
    }

    #[test]
    fn test_format_asset_tag_pads_and_uppercases() {
        assert_eq!(format_asset_tag(" lx_dvo_lap ", 1), "LX_DVO_LAP001");
        assert_eq!(format_asset_tag("LX", 42), "LX042");
        assert_eq!(format_asset_tag("LX", 1000), "LX1000");
    }

    #[test]
    fn test_required_asset_tag() {
        let map = json!({"asset_tag": "X1"}).as_object().unwrap().clone();
        assert_eq!(required_asset_tag(&map).unwrap(), "X1");

        let missing = json!({"serial": "abc"}).as_object().unwrap().clone();
        assert!(matches!(
            required_asset_tag(&missing),
            Err(InventoryError::InvalidInput(_))
        ));
    }
}
