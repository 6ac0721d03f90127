//! Schema evolver: in-place structural changes to a live entity store
//!
//! Reconciliation is positional, by index, not by name: the UI submits the
//! full column list in display order after edits, so a rename-in-place at
//! position `i` must stay a rename instead of being misread as drop+add
//! (which would lose data). Trailing desired columns are added; trailing
//! current columns are dropped only after proving they hold no data.

use sea_orm::{ConnectionTrait, DbBackend, Statement};
use tracing::{debug, info};

use crate::error::{InventoryError, Result};
use crate::sanitize::item_table;
use crate::schema::current_columns;
use crate::types::{ColumnDef, ColumnType};

/// One structural change, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterStep {
    /// Rename the column at a matched position
    Rename { from: String, to: String },
    /// Change a column's storage type, casting existing values
    Retype { name: String, to: ColumnType },
    /// Append a new column, nullable, no default
    Add { name: String, column_type: ColumnType },
    /// Drop a trailing column; executed only after a non-null data probe
    Drop { name: String },
}

/// Compute the minimal ordered step list transforming `current` into
/// `desired` by positional reconciliation. Pure; no storage access.
pub fn plan(current: &[ColumnDef], desired: &[ColumnDef]) -> Vec<AlterStep> {
    let mut steps = Vec::new();
    let matched = current.len().min(desired.len());

    for i in 0..matched {
        if current[i].name != desired[i].name {
            steps.push(AlterStep::Rename {
                from: current[i].name.clone(),
                to: desired[i].name.clone(),
            });
        }
        if current[i].column_type != desired[i].column_type {
            // The rename at this position has already happened by the time
            // the retype runs, so it targets the desired name.
            steps.push(AlterStep::Retype {
                name: desired[i].name.clone(),
                to: desired[i].column_type,
            });
        }
    }

    for column in &desired[matched..] {
        steps.push(AlterStep::Add {
            name: column.name.clone(),
            column_type: column.column_type,
        });
    }

    for column in &current[matched..] {
        steps.push(AlterStep::Drop {
            name: column.name.clone(),
        });
    }

    steps
}

/// Apply `desired` to a live entity store.
///
/// Must run on a transaction connection: the caller owns the commit, and any
/// error here (including [`InventoryError::ColumnNotEmpty`]) rolls the whole
/// operation back, so observers only ever see the store before or after.
pub async fn evolve_entity_store<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
    desired: &[ColumnDef],
) -> Result<()> {
    let current = current_columns(conn, identifier).await?;
    let steps = plan(&current, desired);

    if steps.is_empty() {
        debug!("Entity store {:?} already matches the desired columns", identifier);
        return Ok(());
    }

    let table = item_table(identifier);
    for step in &steps {
        match step {
            AlterStep::Rename { from, to } => {
                execute_ddl(
                    conn,
                    &format!(
                        "ALTER TABLE {} RENAME COLUMN \"{}\" TO \"{}\"",
                        table, from, to
                    ),
                )
                .await?;
            }
            AlterStep::Retype { name, to } => {
                execute_ddl(
                    conn,
                    &format!(
                        "ALTER TABLE {} ALTER COLUMN \"{}\" TYPE {} USING \"{}\"::{}",
                        table,
                        name,
                        to.as_sql(),
                        name,
                        to.as_sql()
                    ),
                )
                .await?;
            }
            AlterStep::Add { name, column_type } => {
                execute_ddl(
                    conn,
                    &format!(
                        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS \"{}\" {}",
                        table,
                        name,
                        column_type.as_sql()
                    ),
                )
                .await?;
            }
            AlterStep::Drop { name } => {
                if column_has_data(conn, identifier, name).await? {
                    return Err(InventoryError::ColumnNotEmpty(name.clone()));
                }
                execute_ddl(
                    conn,
                    &format!("ALTER TABLE {} DROP COLUMN IF EXISTS \"{}\"", table, name),
                )
                .await?;
            }
        }
    }

    info!(
        "Entity store {:?} evolved through {} structural step(s)",
        identifier,
        steps.len()
    );
    Ok(())
}

/// Does any row hold a non-null value in this column?
async fn column_has_data<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
    column: &str,
) -> Result<bool> {
    let stmt = Statement::from_string(
        DbBackend::Postgres,
        format!(
            "SELECT EXISTS (
                SELECT 1 FROM {} WHERE \"{}\" IS NOT NULL LIMIT 1
            ) AS has_data",
            item_table(identifier),
            column
        ),
    );

    let row = conn.query_one(stmt).await?;
    match row {
        Some(row) => Ok(row.try_get::<bool>("", "has_data")?),
        None => Ok(false),
    }
}

/// Structural DDL failures (incompatible casts included) surface as
/// structure errors rather than generic storage errors.
async fn execute_ddl<C: ConnectionTrait>(conn: &C, sql: &str) -> Result<()> {
    debug!("Executing structural change: {}", sql);
    conn.execute_unprepared(sql)
        .await
        .map_err(|e| InventoryError::Structure(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, column_type: ColumnType) -> ColumnDef {
        ColumnDef::new(name, column_type)
    }

    #[test]
    fn test_plan_empty_when_unchanged() {
        let columns = vec![col("serial", ColumnType::Text), col("price", ColumnType::Number)];
        assert!(plan(&columns, &columns).is_empty());
    }

    #[test]
    fn test_plan_rename_in_place_is_not_drop_add() {
        let current = vec![col("serial", ColumnType::Text)];
        let desired = vec![col("asset_serial", ColumnType::Text)];

        assert_eq!(
            plan(&current, &desired),
            vec![AlterStep::Rename {
                from: "serial".to_string(),
                to: "asset_serial".to_string(),
            }]
        );
    }

    #[test]
    fn test_plan_retype_targets_renamed_column() {
        let current = vec![col("qty", ColumnType::Text)];
        let desired = vec![col("quantity", ColumnType::Number)];

        assert_eq!(
            plan(&current, &desired),
            vec![
                AlterStep::Rename {
                    from: "qty".to_string(),
                    to: "quantity".to_string(),
                },
                AlterStep::Retype {
                    name: "quantity".to_string(),
                    to: ColumnType::Number,
                },
            ]
        );
    }

    #[test]
    fn test_plan_appends_new_trailing_columns() {
        let current = vec![col("a", ColumnType::Text)];
        let desired = vec![col("a", ColumnType::Text), col("b", ColumnType::Date)];

        assert_eq!(
            plan(&current, &desired),
            vec![AlterStep::Add {
                name: "b".to_string(),
                column_type: ColumnType::Date,
            }]
        );
    }

    #[test]
    fn test_plan_drops_trailing_removed_columns() {
        let current = vec![col("a", ColumnType::Text), col("b", ColumnType::Text)];
        let desired = vec![col("a", ColumnType::Text)];

        assert_eq!(
            plan(&current, &desired),
            vec![AlterStep::Drop {
                name: "b".to_string(),
            }]
        );
    }

    #[test]
    fn test_plan_mixed_edit() {
        // Rename column 0, retype column 1, add one, while the store also
        // shrinks elsewhere is impossible positionally; verify a combined
        // rename+retype+add sequence keeps execution order.
        let current = vec![col("name", ColumnType::Text), col("count", ColumnType::Text)];
        let desired = vec![
            col("device_name", ColumnType::Text),
            col("count", ColumnType::Number),
            col("bought", ColumnType::Date),
        ];

        assert_eq!(
            plan(&current, &desired),
            vec![
                AlterStep::Rename {
                    from: "name".to_string(),
                    to: "device_name".to_string(),
                },
                AlterStep::Retype {
                    name: "count".to_string(),
                    to: ColumnType::Number,
                },
                AlterStep::Add {
                    name: "bought".to_string(),
                    column_type: ColumnType::Date,
                },
            ]
        );
    }
}
