//! Public operation surface of the inventory engine
//!
//! [`Inventory`] is the facade the REST layer calls. It owns transaction
//! boundaries: every structural change (create, evolve, rename, drop) runs
//! inside a single transaction, so either every part commits or none does,
//! and the catalog never drifts from the stores it describes.

use std::collections::BTreeMap;
use std::sync::Arc;

use db::DatabaseManager;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, JsonValue, Statement, TransactionTrait,
};
use serde::Serialize;
use serde_json::Map;
use tracing::{info, warn};

use crate::audit::{display_fallback, AuditEvent, AuditKind};
use crate::catalog::{self, MenuItem, TableSummary};
use crate::error::{InventoryError, Result};
use crate::evolve;
use crate::records;
use crate::sanitize::{item_table, sanitize, table_path};
use crate::schema;
use crate::types::{parse_columns_strict, sanitize_columns, ColumnDef, ColumnSpec};
use crate::validate::validate_record;

/// A store's current shape, as shown by the structure editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStructure {
    pub identifier: String,
    pub display_name: String,
    pub icon: String,
    pub columns: Vec<ColumnDef>,
}

/// The dynamic schema engine's operation surface
#[derive(Clone)]
pub struct Inventory {
    conn: Arc<DatabaseConnection>,
}

impl Inventory {
    /// Create an engine sharing the manager's connection pool
    pub fn new(db: &DatabaseManager) -> Self {
        Self {
            conn: db.connection_arc(),
        }
    }

    pub fn from_connection(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    // ===== Table lifecycle =====

    /// Create an entity store and register it in the catalog. Re-creating an
    /// existing identifier is a no-op on the store itself; the metadata row
    /// is upserted either way.
    pub async fn create_table(
        &self,
        raw_name: &str,
        display_name: &str,
        icon: Option<&str>,
        parent_group: Option<&str>,
        columns: &[ColumnSpec],
        actor: &str,
    ) -> Result<(String, AuditEvent)> {
        let identifier = ident(raw_name)?;
        let columns = sanitize_columns(columns);
        let display_label = display_or_fallback(display_name, &identifier);

        let txn = self.conn.begin().await?;
        schema::create_entity_store(&txn, &identifier, &columns).await?;
        catalog::upsert_table_meta(&txn, &identifier, &display_label, icon, parent_group).await?;
        txn.commit().await?;

        info!("Created table {:?} ({:?})", identifier, display_label);
        let audit = AuditEvent::new(
            AuditKind::Create,
            "Plus",
            format!("New table \"{}\" created by {}", display_label, actor),
        );
        Ok((identifier, audit))
    }

    /// Evolve a store's columns and refresh its display metadata, as one
    /// transaction.
    pub async fn update_table_structure(
        &self,
        identifier: &str,
        display_name: &str,
        icon: Option<&str>,
        columns: &[ColumnSpec],
        actor: &str,
    ) -> Result<AuditEvent> {
        let identifier = ident(identifier)?;
        if !schema::table_exists(&*self.conn, &identifier).await? {
            return Err(InventoryError::NotFound(identifier));
        }

        let desired = parse_columns_strict(columns)?;
        let display = display_or_fallback(display_name, &identifier);

        let txn = self.conn.begin().await?;
        catalog::upsert_display_icon(&txn, &identifier, &display, icon).await?;
        evolve::evolve_entity_store(&txn, &identifier, &desired).await?;
        txn.commit().await?;

        Ok(AuditEvent::new(
            AuditKind::Update,
            "Edit3",
            format!("Updated \"{}\" by {}", display, actor),
        ))
    }

    /// Light path for display-name/icon changes: no transaction, no DDL
    pub async fn update_table_meta(
        &self,
        identifier: &str,
        display_name: &str,
        icon: Option<&str>,
        actor: &str,
    ) -> Result<AuditEvent> {
        let identifier = ident(identifier)?;
        let display = display_or_fallback(display_name, &identifier);
        catalog::update_table_meta(&*self.conn, &identifier, &display, icon).await?;

        Ok(AuditEvent::new(
            AuditKind::Update,
            "Edit3",
            format!("Updated \"{}\" table settings by {}", display, actor),
        ))
    }

    /// Rename a store, deriving the new identifier from the sanitized
    /// display name. The store rename, the catalog re-key, and the rewrite
    /// of any menu entry targeting this table commit together or not at all.
    pub async fn rename_table(
        &self,
        old_identifier: &str,
        new_display_name: &str,
        actor: &str,
    ) -> Result<(String, AuditEvent)> {
        let old = ident(old_identifier)?;
        let new = ident(new_display_name)?;

        if !schema::table_exists(&*self.conn, &old).await? {
            return Err(InventoryError::NotFound(old));
        }
        if schema::table_exists(&*self.conn, &new).await? {
            return Err(InventoryError::AlreadyExists(new));
        }

        let old_display = self.display_name_for(&old).await?;
        let new_display = display_or_fallback(new_display_name, &new);

        // A rename blocks behind any open query against the old name, so
        // sweep conflicting sessions first. One-shot; failure is logged and
        // the rename proceeds regardless.
        self.terminate_conflicting_sessions(&old).await;

        let txn = self.conn.begin().await?;
        txn.execute_unprepared(&format!(
            "ALTER TABLE {} RENAME TO \"{}\"",
            item_table(&old),
            new
        ))
        .await
        .map_err(|e| InventoryError::Structure(e.to_string()))?;
        catalog::rename_table_meta(&txn, &old, &new, &new_display).await?;
        let retargeted =
            catalog::retarget_menu_entries(&txn, &table_path(&old), &table_path(&new), &new_display)
                .await?;
        txn.commit().await?;

        info!(
            "Renamed table {:?} to {:?} ({} menu entr(ies) retargeted)",
            old, new, retargeted
        );
        let audit = AuditEvent::new(
            AuditKind::Update,
            "Edit3",
            format!(
                "Renamed table \"{}\" to \"{}\" by {}",
                old_display, new_display, actor
            ),
        );
        Ok((new, audit))
    }

    /// Drop an empty store and every catalog reference to it. Guarded: a
    /// table that still has submenus or records is not droppable.
    pub async fn drop_table(&self, identifier: &str, actor: &str) -> Result<AuditEvent> {
        let identifier = ident(identifier)?;
        if !schema::table_exists(&*self.conn, &identifier).await? {
            return Err(InventoryError::NotFound(identifier));
        }

        let submenus = catalog::count_submenus(&*self.conn, &identifier).await?;
        if submenus > 0 {
            return Err(InventoryError::HasSubmenus(submenus));
        }

        let record_count = records::count(&*self.conn, &identifier).await?;
        if record_count > 0 {
            return Err(InventoryError::HasRecords(record_count));
        }

        let display = self.display_name_for(&identifier).await?;

        let txn = self.conn.begin().await?;
        txn.execute_unprepared(&format!(
            "DROP TABLE IF EXISTS {} CASCADE",
            item_table(&identifier)
        ))
        .await
        .map_err(|e| InventoryError::Structure(e.to_string()))?;
        catalog::delete_table_meta(&txn, &identifier).await?;
        catalog::remove_menu_entries(&txn, &identifier).await?;
        catalog::remove_menu_entries_by_target(&txn, &table_path(&identifier)).await?;
        txn.commit().await?;

        info!("Dropped table {:?}", identifier);
        Ok(AuditEvent::new(
            AuditKind::Delete,
            "Trash2",
            format!("Deleted \"{}\" Table by {}", display, actor),
        ))
    }

    /// Does an entity store with this identifier exist?
    pub async fn table_exists(&self, identifier: &str) -> Result<bool> {
        let identifier = ident(identifier)?;
        schema::table_exists(&*self.conn, &identifier).await
    }

    /// The store's registered metadata and current custom columns
    pub async fn table_structure(&self, identifier: &str) -> Result<TableStructure> {
        let identifier = ident(identifier)?;
        if !schema::table_exists(&*self.conn, &identifier).await? {
            return Err(InventoryError::NotFound(identifier));
        }

        let meta = catalog::get_table_meta(&*self.conn, &identifier).await?;
        let columns = schema::current_columns(&*self.conn, &identifier).await?;

        let (display_name, icon) = match meta {
            Some(meta) => (meta.display_name, meta.icon),
            None => (
                display_fallback(&identifier),
                catalog::DEFAULT_ICON.to_string(),
            ),
        };

        Ok(TableStructure {
            identifier,
            display_name,
            icon,
            columns,
        })
    }

    /// All registered tables, sorted by identifier
    pub async fn list_tables(&self) -> Result<Vec<TableSummary>> {
        catalog::list_tables(&*self.conn).await
    }

    // ===== Menu hierarchy =====

    /// All submenus grouped by parent table, siblings in display order
    pub async fn menu_hierarchy(&self) -> Result<BTreeMap<String, Vec<MenuItem>>> {
        catalog::list_menu_hierarchy(&*self.conn).await
    }

    /// Append one or more submenu entries under a parent table
    pub async fn add_menu_entries(
        &self,
        parent: &str,
        label: &str,
        path: Option<&str>,
        count: u32,
        actor: &str,
    ) -> Result<(Vec<MenuItem>, AuditEvent)> {
        let parent = ident(parent)?;
        let label = label.trim();
        if label.is_empty() {
            return Err(InventoryError::InvalidInput("label is required".to_string()));
        }

        let txn = self.conn.begin().await?;
        let created = catalog::add_menu_entries(&txn, &parent, label, path, count).await?;
        txn.commit().await?;

        let audit = AuditEvent::new(
            AuditKind::Create,
            "Plus",
            format!("Created submenu under \"{}\" by {}", parent, actor),
        );
        Ok((created, audit))
    }

    /// Update one submenu's label and path
    pub async fn update_menu_entry(
        &self,
        parent: &str,
        old_path: &str,
        new_path: &str,
        new_label: &str,
        actor: &str,
    ) -> Result<AuditEvent> {
        let parent = ident(parent)?;
        catalog::update_menu_entry(&*self.conn, &parent, old_path, new_path, new_label).await?;

        Ok(AuditEvent::new(
            AuditKind::Update,
            "Edit3",
            format!("Updated submenu label to \"{}\" by {}", new_label.trim(), actor),
        ))
    }

    // ===== Records =====

    /// Insert a record, stamping audit fields and enforcing asset-tag
    /// uniqueness
    pub async fn insert_record(
        &self,
        identifier: &str,
        record: &JsonValue,
        actor: &str,
    ) -> Result<(JsonValue, AuditEvent)> {
        let identifier = self.existing_table(identifier).await?;
        let cleaned = validated_map(record)?;

        let item = cleaned
            .get("asset_tag")
            .or_else(|| cleaned.get("item_name"))
            .and_then(JsonValue::as_str)
            .unwrap_or("item")
            .to_string();

        let row = records::insert(&*self.conn, &identifier, cleaned, actor).await?;
        let display = self.display_name_for(&identifier).await?;

        let audit = AuditEvent::new(
            AuditKind::Success,
            "Plus",
            format!("Added \"{}\" to \"{}\" by {}", item, display, actor),
        );
        Ok((row, audit))
    }

    /// Apply a partial update to one record
    pub async fn update_record(
        &self,
        identifier: &str,
        asset_tag: &str,
        patch: &JsonValue,
        actor: &str,
    ) -> Result<(JsonValue, AuditEvent)> {
        let identifier = self.existing_table(identifier).await?;
        let cleaned = validated_map(patch)?;

        let row = records::update(&*self.conn, &identifier, asset_tag, cleaned, actor).await?;
        let display = self.display_name_for(&identifier).await?;

        let audit = AuditEvent::new(
            AuditKind::Update,
            "Edit3",
            format!("Updated record in \"{}\" by {}", display, actor),
        );
        Ok((row, audit))
    }

    /// Delete one record, returning the deleted row
    pub async fn delete_record(
        &self,
        identifier: &str,
        asset_tag: &str,
        actor: &str,
    ) -> Result<(JsonValue, AuditEvent)> {
        let identifier = self.existing_table(identifier).await?;
        let row = records::delete(&*self.conn, &identifier, asset_tag).await?;
        let display = self.display_name_for(&identifier).await?;

        let audit = AuditEvent::new(
            AuditKind::Delete,
            "Trash2",
            format!(
                "Deleted \"{}\" from \"{}\" Table by {}",
                asset_tag, display, actor
            ),
        );
        Ok((row, audit))
    }

    /// All records in a store, newest first
    pub async fn list_records(&self, identifier: &str) -> Result<Vec<JsonValue>> {
        let identifier = self.existing_table(identifier).await?;
        records::list(&*self.conn, &identifier).await
    }

    /// Fetch one record by asset tag
    pub async fn get_record(&self, identifier: &str, asset_tag: &str) -> Result<JsonValue> {
        let identifier = self.existing_table(identifier).await?;
        records::get_one(&*self.conn, &identifier, asset_tag).await
    }

    /// Number of records in a store
    pub async fn count_records(&self, identifier: &str) -> Result<u64> {
        let identifier = self.existing_table(identifier).await?;
        records::count(&*self.conn, &identifier).await
    }

    /// Generate the next asset tag for a store from an uppercase prefix
    pub async fn generate_asset_tag(&self, identifier: &str, prefix: &str) -> Result<String> {
        let identifier = self.existing_table(identifier).await?;
        records::generate_asset_tag(&*self.conn, &identifier, prefix).await
    }

    // ===== Internals =====

    async fn existing_table(&self, identifier: &str) -> Result<String> {
        let identifier = ident(identifier)?;
        if !schema::table_exists(&*self.conn, &identifier).await? {
            return Err(InventoryError::NotFound(identifier));
        }
        Ok(identifier)
    }

    async fn display_name_for(&self, identifier: &str) -> Result<String> {
        Ok(catalog::get_table_meta(&*self.conn, identifier)
            .await?
            .map(|meta| meta.display_name)
            .unwrap_or_else(|| display_fallback(identifier)))
    }

    /// Best-effort sweep of sessions still querying the old table name,
    /// so the rename does not stall behind storage-level locks.
    async fn terminate_conflicting_sessions(&self, identifier: &str) {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT pg_terminate_backend(pid)
             FROM pg_stat_activity
             WHERE datname = current_database()
               AND pid <> pg_backend_pid()
               AND query ILIKE $1",
            [format!("%{}%", identifier).into()],
        );

        if let Err(e) = self.conn.execute(stmt).await {
            warn!("Session sweep before rename failed: {}", e);
        }
    }
}

fn ident(raw: &str) -> Result<String> {
    sanitize(raw).ok_or_else(|| InventoryError::InvalidIdentifier(raw.to_string()))
}

fn display_or_fallback(display_name: &str, identifier: &str) -> String {
    let trimmed = display_name.trim();
    if trimmed.is_empty() {
        display_fallback(identifier)
    } else {
        trimmed.to_string()
    }
}

fn validated_map(record: &JsonValue) -> Result<Map<String, JsonValue>> {
    let map = record
        .as_object()
        .ok_or_else(|| InventoryError::InvalidInput("record must be a JSON object".to_string()))?;

    validate_record(map).map_err(InventoryError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_or_fallback() {
        assert_eq!(display_or_fallback("  Laptops  ", "laptops"), "Laptops");
        assert_eq!(display_or_fallback("", "my_laptops"), "My Laptops");
        assert_eq!(display_or_fallback("   ", "monitors"), "Monitors");
    }

    #[test]
    fn test_ident_rejects_unusable_names() {
        assert!(matches!(
            ident("!!!"),
            Err(InventoryError::InvalidIdentifier(_))
        ));
        assert_eq!(ident("My Laptops").unwrap(), "my_laptops");
    }

    #[test]
    fn test_validated_map_requires_object() {
        let err = validated_map(&serde_json::json!([1, 2])).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidInput(_)));
    }
}
