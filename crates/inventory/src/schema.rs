//! Schema synthesizer: DDL generation for new entity stores
//!
//! Identifiers reaching this module are already sanitized; values are always
//! bound, never interpolated.

use sea_orm::{ConnectionTrait, DbBackend, Statement};
use tracing::info;

use crate::error::{InventoryError, Result};
use crate::sanitize::item_table;
use crate::types::{ColumnDef, SYSTEM_COLUMNS};

/// System columns present on every entity store, in fixed order
const SYSTEM_COLUMNS_SQL: &str = "asset_tag TEXT PRIMARY KEY,\n    \
    created_at TIMESTAMPTZ DEFAULT NOW(),\n    \
    created_by TEXT,\n    \
    updated_at TIMESTAMPTZ DEFAULT NOW(),\n    \
    updated_by TEXT,\n    \
    status TEXT DEFAULT 'Available'";

/// Generate the `CREATE TABLE` statement for a new entity store:
/// the six system columns followed by the user columns in the given order.
pub fn create_table_sql(identifier: &str, columns: &[ColumnDef]) -> String {
    let mut body = String::from(SYSTEM_COLUMNS_SQL);
    for column in columns {
        body.push_str(",\n    ");
        body.push_str(&format!("\"{}\" {}", column.name, column.column_type.as_sql()));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        item_table(identifier),
        body
    )
}

/// Materialize a new entity store. Re-creating an existing store is a no-op
/// (`IF NOT EXISTS`); DDL failures surface as structure errors.
pub async fn create_entity_store<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
    columns: &[ColumnDef],
) -> Result<()> {
    let sql = create_table_sql(identifier, columns);
    conn.execute_unprepared(&sql)
        .await
        .map_err(|e| InventoryError::Structure(e.to_string()))?;

    info!(
        "Entity store {:?} ensured with {} custom column(s)",
        identifier,
        columns.len()
    );
    Ok(())
}

/// Does an entity store with this identifier exist?
pub async fn table_exists<C: ConnectionTrait>(conn: &C, identifier: &str) -> Result<bool> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT EXISTS (
            SELECT 1 FROM information_schema.tables
            WHERE table_schema = 'inventory_items' AND table_name = $1
        ) AS exists",
        [identifier.into()],
    );

    let row = conn.query_one(stmt).await?;
    match row {
        Some(row) => Ok(row.try_get::<bool>("", "exists")?),
        None => Ok(false),
    }
}

/// Current custom columns of an entity store, in ordinal order, with system
/// columns excluded. A column whose storage type falls outside the
/// vocabulary means the store was altered out from under us and is reported
/// as a structure error.
pub async fn current_columns<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
) -> Result<Vec<ColumnDef>> {
    let placeholders: Vec<String> = (2..=SYSTEM_COLUMNS.len() + 1)
        .map(|i| format!("${}", i))
        .collect();
    let sql = format!(
        "SELECT column_name, data_type
         FROM information_schema.columns
         WHERE table_schema = 'inventory_items'
           AND table_name = $1
           AND column_name NOT IN ({})
         ORDER BY ordinal_position",
        placeholders.join(", ")
    );

    let mut values: Vec<sea_orm::Value> = vec![identifier.into()];
    values.extend(SYSTEM_COLUMNS.iter().map(|&c| c.into()));

    let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);
    let rows = conn.query_all(stmt).await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("", "column_name")?;
        let data_type: String = row.try_get("", "data_type")?;
        let column_type = crate::types::ColumnType::from_data_type(&data_type).ok_or_else(|| {
            InventoryError::Structure(format!(
                "column \"{}\" has unsupported storage type {:?}",
                name, data_type
            ))
        })?;
        columns.push(ColumnDef { name, column_type });
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnType;

    #[test]
    fn test_create_table_sql_system_columns_first() {
        let sql = create_table_sql(
            "laptops",
            &[
                ColumnDef::new("serial", ColumnType::Text),
                ColumnDef::new("price", ColumnType::Number),
                ColumnDef::new("purchased", ColumnType::Date),
                ColumnDef::new("in_repair", ColumnType::Boolean),
            ],
        );

        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS inventory_items.\"laptops\""));
        let tag_pos = sql.find("asset_tag TEXT PRIMARY KEY").unwrap();
        let serial_pos = sql.find("\"serial\" text").unwrap();
        assert!(tag_pos < serial_pos);
        assert!(sql.contains("status TEXT DEFAULT 'Available'"));
        assert!(sql.contains("\"price\" double precision"));
        assert!(sql.contains("\"purchased\" date"));
        assert!(sql.contains("\"in_repair\" boolean"));
    }

    #[test]
    fn test_create_table_sql_no_custom_columns() {
        let sql = create_table_sql("empty_store", &[]);
        assert!(sql.contains("asset_tag TEXT PRIMARY KEY"));
        // No trailing comma after the system block
        assert!(sql.trim_end().ends_with(')'));
        assert!(!sql.contains(",\n)"));
    }
}
