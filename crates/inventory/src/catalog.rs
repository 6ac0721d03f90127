//! Metadata catalog: table registry and menu hierarchy
//!
//! Every function takes a generic connection so callers can run it against
//! the pool or inside a transaction shared with a sibling structural change.

use std::collections::BTreeMap;

use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use tracing::debug;

use crate::entity::{menu_entry, table_metadata};
use crate::error::{InventoryError, Result};

/// Icon assigned when the caller supplies none
pub const DEFAULT_ICON: &str = "NotebookText";

/// Bounds for bulk menu-entry creation, preventing runaway creation
const MENU_ENTRY_RANGE: std::ops::RangeInclusive<u32> = 1..=20;

/// One registered entity store, as listed to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub identifier: String,
    pub display_name: String,
    pub icon: String,
}

/// One submenu placement under a parent table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub id: i64,
    pub label: String,
    pub path: String,
}

/// List all registered tables, sorted by identifier
pub async fn list_tables<C: ConnectionTrait>(conn: &C) -> Result<Vec<TableSummary>> {
    let rows = table_metadata::Entity::find()
        .order_by_asc(table_metadata::Column::TableName)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| TableSummary {
            identifier: row.table_name,
            display_name: row.display_name,
            icon: row.icon,
        })
        .collect())
}

/// Fetch the metadata row for one table
pub async fn get_table_meta<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
) -> Result<Option<table_metadata::Model>> {
    Ok(table_metadata::Entity::find_by_id(identifier.to_string())
        .one(conn)
        .await?)
}

/// Insert-or-update the metadata row, keyed on the table identifier
pub async fn upsert_table_meta<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
    display_name: &str,
    icon: Option<&str>,
    parent_group: Option<&str>,
) -> Result<()> {
    let model = table_metadata::ActiveModel {
        table_name: Set(identifier.to_string()),
        display_name: Set(display_name.to_string()),
        icon: Set(icon.unwrap_or(DEFAULT_ICON).to_string()),
        parent_group: Set(parent_group.map(str::to_string)),
    };

    table_metadata::Entity::insert(model)
        .on_conflict(
            OnConflict::column(table_metadata::Column::TableName)
                .update_columns([
                    table_metadata::Column::DisplayName,
                    table_metadata::Column::Icon,
                    table_metadata::Column::ParentGroup,
                ])
                .to_owned(),
        )
        .exec(conn)
        .await?;

    Ok(())
}

/// Insert-or-update display name and icon, leaving any parent group intact
pub async fn upsert_display_icon<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
    display_name: &str,
    icon: Option<&str>,
) -> Result<()> {
    let model = table_metadata::ActiveModel {
        table_name: Set(identifier.to_string()),
        display_name: Set(display_name.to_string()),
        icon: Set(icon.unwrap_or(DEFAULT_ICON).to_string()),
        parent_group: Set(None),
    };

    table_metadata::Entity::insert(model)
        .on_conflict(
            OnConflict::column(table_metadata::Column::TableName)
                .update_columns([
                    table_metadata::Column::DisplayName,
                    table_metadata::Column::Icon,
                ])
                .to_owned(),
        )
        .exec(conn)
        .await?;

    Ok(())
}

/// Update display name and icon for an existing table, without DDL cost
pub async fn update_table_meta<C: ConnectionTrait>(
    conn: &C,
    identifier: &str,
    display_name: &str,
    icon: Option<&str>,
) -> Result<()> {
    let result = table_metadata::Entity::update_many()
        .col_expr(
            table_metadata::Column::DisplayName,
            Expr::value(display_name),
        )
        .col_expr(
            table_metadata::Column::Icon,
            Expr::value(icon.unwrap_or(DEFAULT_ICON)),
        )
        .filter(table_metadata::Column::TableName.eq(identifier))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(InventoryError::NotFound(identifier.to_string()));
    }

    Ok(())
}

/// Re-key the metadata row during a table rename
pub async fn rename_table_meta<C: ConnectionTrait>(
    conn: &C,
    old_identifier: &str,
    new_identifier: &str,
    new_display_name: &str,
) -> Result<()> {
    let result = table_metadata::Entity::update_many()
        .col_expr(table_metadata::Column::TableName, Expr::value(new_identifier))
        .col_expr(
            table_metadata::Column::DisplayName,
            Expr::value(new_display_name),
        )
        .filter(table_metadata::Column::TableName.eq(old_identifier))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(InventoryError::NotFound(old_identifier.to_string()));
    }

    Ok(())
}

/// Delete the metadata row for one table
pub async fn delete_table_meta<C: ConnectionTrait>(conn: &C, identifier: &str) -> Result<()> {
    table_metadata::Entity::delete_by_id(identifier.to_string())
        .exec(conn)
        .await?;
    Ok(())
}

/// All submenus grouped by parent table, siblings in display order
pub async fn list_menu_hierarchy<C: ConnectionTrait>(
    conn: &C,
) -> Result<BTreeMap<String, Vec<MenuItem>>> {
    let rows = menu_entry::Entity::find()
        .order_by_asc(menu_entry::Column::ParentTableName)
        .order_by_asc(menu_entry::Column::DisplayOrder)
        .all(conn)
        .await?;

    let mut grouped: BTreeMap<String, Vec<MenuItem>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.parent_table_name)
            .or_default()
            .push(MenuItem {
                id: row.id,
                label: row.submenu_label,
                path: row.submenu_path.unwrap_or_else(|| "#".to_string()),
            });
    }

    Ok(grouped)
}

/// Number of submenus attached to a parent table
pub async fn count_submenus<C: ConnectionTrait>(conn: &C, parent: &str) -> Result<u64> {
    Ok(menu_entry::Entity::find()
        .filter(menu_entry::Column::ParentTableName.eq(parent))
        .count(conn)
        .await?)
}

/// Append `count` submenu entries under a parent, continuing its
/// `display_order` sequence. With `count > 1` the labels get a 1-based
/// index suffix.
pub async fn add_menu_entries<C: ConnectionTrait>(
    conn: &C,
    parent: &str,
    label: &str,
    path: Option<&str>,
    count: u32,
) -> Result<Vec<MenuItem>> {
    if !MENU_ENTRY_RANGE.contains(&count) {
        return Err(InventoryError::InvalidInput(format!(
            "count must be between {} and {}",
            MENU_ENTRY_RANGE.start(),
            MENU_ENTRY_RANGE.end()
        )));
    }

    let next_order = menu_entry::Entity::find()
        .filter(menu_entry::Column::ParentTableName.eq(parent))
        .order_by_desc(menu_entry::Column::DisplayOrder)
        .one(conn)
        .await?
        .map_or(0, |row| row.display_order + 1);

    let mut created = Vec::with_capacity(count as usize);
    for i in 0..count {
        let model = menu_entry::ActiveModel {
            parent_table_name: Set(parent.to_string()),
            submenu_label: Set(indexed_label(label, count, i)),
            submenu_path: Set(path.map(str::to_string)),
            display_order: Set(next_order + i as i32),
            ..Default::default()
        };

        let inserted = model.insert(conn).await?;
        created.push(MenuItem {
            id: inserted.id,
            label: inserted.submenu_label,
            path: inserted.submenu_path.unwrap_or_else(|| "#".to_string()),
        });
    }

    debug!("Added {} menu entries under {:?}", created.len(), parent);
    Ok(created)
}

/// Update one submenu's label and path, matched by parent and current path
pub async fn update_menu_entry<C: ConnectionTrait>(
    conn: &C,
    parent: &str,
    old_path: &str,
    new_path: &str,
    new_label: &str,
) -> Result<()> {
    let result = menu_entry::Entity::update_many()
        .col_expr(menu_entry::Column::SubmenuLabel, Expr::value(new_label.trim()))
        .col_expr(menu_entry::Column::SubmenuPath, Expr::value(new_path))
        .filter(menu_entry::Column::ParentTableName.eq(parent))
        .filter(menu_entry::Column::SubmenuPath.eq(old_path))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(InventoryError::NotFound(format!(
            "submenu {:?} under {:?}",
            old_path, parent
        )));
    }

    Ok(())
}

/// Rewrite every menu entry pointing at `old_path`, regardless of parent.
/// Returns the number of entries rewritten.
pub async fn retarget_menu_entries<C: ConnectionTrait>(
    conn: &C,
    old_path: &str,
    new_path: &str,
    new_label: &str,
) -> Result<u64> {
    let result = menu_entry::Entity::update_many()
        .col_expr(menu_entry::Column::SubmenuLabel, Expr::value(new_label))
        .col_expr(menu_entry::Column::SubmenuPath, Expr::value(new_path))
        .filter(menu_entry::Column::SubmenuPath.eq(old_path))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

/// Remove every submenu entry under a parent table
pub async fn remove_menu_entries<C: ConnectionTrait>(conn: &C, parent: &str) -> Result<u64> {
    let result = menu_entry::Entity::delete_many()
        .filter(menu_entry::Column::ParentTableName.eq(parent))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

/// Remove every menu entry whose path ends with `path_suffix`
pub async fn remove_menu_entries_by_target<C: ConnectionTrait>(
    conn: &C,
    path_suffix: &str,
) -> Result<u64> {
    let result = menu_entry::Entity::delete_many()
        .filter(menu_entry::Column::SubmenuPath.like(format!("%{}", path_suffix)))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

fn indexed_label(label: &str, count: u32, i: u32) -> String {
    if count > 1 {
        format!("{} {}", label, i + 1)
    } else {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_label_suffixes_only_batches() {
        assert_eq!(indexed_label("Peripherals", 1, 0), "Peripherals");
        assert_eq!(indexed_label("Peripherals", 3, 0), "Peripherals 1");
        assert_eq!(indexed_label("Peripherals", 3, 2), "Peripherals 3");
    }

    #[test]
    fn test_menu_entry_range_bounds() {
        assert!(!MENU_ENTRY_RANGE.contains(&0));
        assert!(MENU_ENTRY_RANGE.contains(&1));
        assert!(MENU_ENTRY_RANGE.contains(&20));
        assert!(!MENU_ENTRY_RANGE.contains(&21));
    }
}
