//! Error types for the inventory engine

use sea_orm::{ConnAcquireErr, DbErr, SqlErr};
use thiserror::Error;

use crate::validate::FieldError;

/// Error type for inventory engine operations.
///
/// Every variant except [`InventoryError::Storage`] is an expected,
/// caller-recoverable condition; the REST layer maps them to user-facing
/// messages and status codes.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Raw name sanitizes to the empty string
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Table or column name collision on create or rename
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Referenced table, record, or menu entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Asset tag uniqueness violated on insert or update
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Attempted to drop a column that still holds data
    #[error("Column \"{0}\" still contains data")]
    ColumnNotEmpty(String),

    /// Attempted to drop a table that still holds records
    #[error("Table contains {0} record(s)")]
    HasRecords(u64),

    /// Attempted to drop a table that still has submenus
    #[error("Table has {0} submenu(s)")]
    HasSubmenus(u64),

    /// Type-cast or DDL failure during a structural change
    #[error("Structure change failed: {0}")]
    Structure(String),

    /// Caller-supplied argument outside the accepted range or shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Record failed field validation; carries every field error at once
    #[error("Record validation failed ({} field error(s))", .0.len())]
    Validation(Vec<FieldError>),

    /// Storage connection pool could not serve the request in time
    #[error("Connection pool exhausted: {0}")]
    ResourceExhausted(String),

    /// Unexpected storage-layer failure
    #[error("Database error: {0}")]
    Storage(DbErr),
}

impl From<DbErr> for InventoryError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return Self::DuplicateKey(detail);
        }
        if let DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) = err {
            return Self::ResourceExhausted(
                "timed out acquiring a pooled connection".to_string(),
            );
        }
        Self::Storage(err)
    }
}

/// Result type alias for inventory engine operations
pub type Result<T> = std::result::Result<T, InventoryError>;
