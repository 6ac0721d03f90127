//! Bootstrap of the reserved storage namespaces
//!
//! User-defined entity stores live in the `inventory_items` schema and the
//! catalog in `inventory_meta`, so a user-chosen table name can never collide
//! with system tables. Every statement is idempotent; bootstrap runs on each
//! startup.

use sea_orm::{ConnectionTrait, DatabaseConnection};
use tracing::info;

use crate::error::Result;

const BOOTSTRAP_STATEMENTS: &[&str] = &[
    "CREATE SCHEMA IF NOT EXISTS inventory_items",
    "CREATE SCHEMA IF NOT EXISTS inventory_meta",
    r#"CREATE TABLE IF NOT EXISTS inventory_meta.tablename_icon (
        table_name TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        icon TEXT NOT NULL DEFAULT 'NotebookText',
        parent_group TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS inventory_meta.menu_hierarchy (
        id BIGSERIAL PRIMARY KEY,
        parent_table_name TEXT NOT NULL,
        submenu_label TEXT NOT NULL,
        submenu_path TEXT,
        display_order INT NOT NULL
    )"#,
];

/// Ensure the reserved schemas and catalog tables exist
pub async fn ensure_namespaces(conn: &DatabaseConnection) -> Result<()> {
    for sql in BOOTSTRAP_STATEMENTS {
        conn.execute_unprepared(sql).await?;
    }

    info!("Storage namespaces and catalog tables ensured");
    Ok(())
}
