//! Error types for storage-layer plumbing

use thiserror::Error;

/// Error type for pool and bootstrap operations
#[derive(Error, Debug)]
pub enum DbError {
    /// Database connection or operation error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for storage-layer operations
pub type Result<T> = std::result::Result<T, DbError>;
