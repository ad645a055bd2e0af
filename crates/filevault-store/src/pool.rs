//! SQLite pool shared by the metadata and configuration stores
//!
//! Schema changes are numbered scripts applied in order on connect. The
//! number of the last one applied is kept in `PRAGMA user_version`.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::StoreError;

/// Schema scripts, oldest first. Version N is `MIGRATIONS[N - 1]`.
const MIGRATIONS: &[&str] = &[include_str!("migrations/20260301_initial.sql")];

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const FILE_CONNECTIONS: u32 = 5;

pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens the database file at `path`, creating it and its directory
    /// if needed
    ///
    /// # Errors
    ///
    /// `StoreError::ConnectionFailed` if the file cannot be opened,
    /// `StoreError::MigrationFailed` if the schema cannot be brought up to
    /// date or was written by a newer build.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!("{}: {}", parent.display(), e))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let db = Self::connect(options, FILE_CONNECTIONS).await?;

        info!(
            path = %path.display(),
            schema = db.schema_version().await?,
            "Database ready"
        );
        Ok(db)
    }

    /// A private database that lives as long as the pool
    ///
    /// Each connection to `:memory:` sees its own database, so the pool
    /// holds exactly one.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Self::connect(options, 1).await
    }

    async fn connect(
        options: SqliteConnectOptions,
        max_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of schema scripts applied to this database
    pub async fn schema_version(&self) -> Result<i64, StoreError> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        let current = self.schema_version().await?;
        let latest = MIGRATIONS.len() as i64;
        if !(0..=latest).contains(&current) {
            return Err(StoreError::MigrationFailed(format!(
                "schema version {current} is not supported (latest known is {latest})"
            )));
        }

        for (index, script) in MIGRATIONS.iter().enumerate().skip(current as usize) {
            let version = index as i64 + 1;
            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(script)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("version {version}: {e}")))?;
            // PRAGMA takes no bind parameters
            let bump = format!("PRAGMA user_version = {version}");
            sqlx::raw_sql(&bump).execute(&mut *tx).await?;
            tx.commit().await?;
            debug!(version, "Schema migration applied");
        }
        Ok(())
    }
}
