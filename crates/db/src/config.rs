//! Configuration for the storage connection pool

use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};

/// Configuration for the storage connection pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Database connection URL (Postgres)
    pub database_url: String,

    /// Maximum database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections kept warm in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection establishment timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Timeout for acquiring a pooled connection, in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Close idle connections after this many seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Recreate pooled connections after this many seconds
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,

    /// Enable SQL query logging
    #[serde(default)]
    pub enable_sql_logging: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            acquire_timeout_secs: default_acquire_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            enable_sql_logging: false,
        }
    }
}

impl DbConfig {
    /// Load configuration from the environment, reading `.env` if present.
    ///
    /// `DATABASE_URL` is required; the pool knobs fall back to their
    /// defaults when the corresponding `INVENTORY_*` variables are unset.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| DbError::Config("DATABASE_URL is not set".to_string()))?;

        let mut config = Self {
            database_url,
            ..Self::default()
        };

        if let Some(v) = env_u32("INVENTORY_MAX_CONNECTIONS")? {
            config.max_connections = v;
        }
        if let Some(v) = env_u32("INVENTORY_MIN_CONNECTIONS")? {
            config.min_connections = v;
        }
        if let Some(v) = env_u64("INVENTORY_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout_secs = v;
        }
        if let Some(v) = env_u64("INVENTORY_ACQUIRE_TIMEOUT_SECS")? {
            config.acquire_timeout_secs = v;
        }
        if std::env::var("INVENTORY_SQL_LOGGING").as_deref() == Ok("true") {
            config.enable_sql_logging = true;
        }

        Ok(config)
    }
}

fn env_u32(name: &str) -> Result<Option<u32>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| DbError::Config(format!("{} must be an integer, got {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| DbError::Config(format!("{} must be an integer, got {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_max_lifetime() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: DbConfig =
            serde_json::from_str(r#"{"database_url": "postgres://localhost/inv"}"#).unwrap();

        assert_eq!(config.database_url, "postgres://localhost/inv");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout_secs, 30);
        assert!(!config.enable_sql_logging);
    }
}
