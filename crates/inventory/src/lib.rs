//! Dynamic schema engine for the inventory admin panel
//!
//! This crate lets an administrator declare a record type at runtime (name,
//! columns, types) and have the system materialize, evolve, and safely query
//! a persistent Postgres store for it. The REST layer, authentication, and
//! the notification feed are external collaborators: they call the
//! operations exposed by [`Inventory`] and receive typed results plus an
//! [`AuditEvent`] describing each mutation.

pub mod audit;
pub mod catalog;
pub mod entity;
pub mod error;
pub mod evolve;
pub mod records;
pub mod sanitize;
pub mod schema;
pub mod service;
pub mod types;
pub mod validate;

pub use audit::{AuditEvent, AuditKind};
pub use catalog::{MenuItem, TableSummary};
pub use error::{InventoryError, Result};
pub use service::{Inventory, TableStructure};
pub use types::{ColumnDef, ColumnSpec, ColumnType};
pub use validate::FieldError;
