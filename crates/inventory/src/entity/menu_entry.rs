//! MenuEntry entity: a sub-table's placement in the navigation hierarchy

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(schema_name = "inventory_meta", table_name = "menu_hierarchy")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub parent_table_name: String,
    pub submenu_label: String,
    pub submenu_path: Option<String>,
    pub display_order: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
