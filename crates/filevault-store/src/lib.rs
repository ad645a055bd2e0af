//! FileVault Store - Reference persistence adapters
//!
//! Driven (secondary) adapters for the ports defined in `filevault-core`:
//!
//! - [`SqliteMetadataStore`] - `IMetadataStore` over the `items` table
//! - [`SqliteConfigurationStore`] - `IConfigurationStore` over the
//!   `sync_configurations` table
//! - [`FsObjectStore`] - `IObjectStore` keeping payloads on the local disk
//!
//! Both SQLite adapters share one [`DatabasePool`].
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use filevault_store::{DatabasePool, SqliteConfigurationStore, SqliteMetadataStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::open(Path::new("/home/user/.local/share/filevault/filevault.db")).await?;
//! let metadata = SqliteMetadataStore::new(pool.pool().clone());
//! let configurations = SqliteConfigurationStore::new(pool.pool().clone());
//! # Ok(())
//! # }
//! ```

pub mod configuration;
pub mod metadata;
pub mod objects;
pub mod pool;

pub use configuration::SqliteConfigurationStore;
pub use metadata::SqliteMetadataStore;
pub use objects::FsObjectStore;
pub use pool::DatabasePool;

use chrono::{DateTime, Utc};

/// Errors that can occur in the store adapters
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be turned back into a domain type
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}

impl From<filevault_core::domain::DomainError> for StoreError {
    fn from(e: filevault_core::domain::DomainError) -> Self {
        StoreError::CorruptRow(e.to_string())
    }
}

/// Parse a timestamp written with `to_rfc3339()`
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow(format!("Failed to parse datetime '{}': {}", s, e)))
}

pub(crate) fn parse_optional_datetime(
    s: Option<String>,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}
