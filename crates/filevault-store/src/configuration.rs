//! SQLite implementation of IConfigurationStore

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{info, instrument};

use filevault_core::domain::{
    ConfigurationId, ItemId, SyncConfiguration, SyncPath, SyncType, UserId,
};
use filevault_core::ports::IConfigurationStore;

use crate::{parse_datetime, parse_optional_datetime, StoreError};

/// Sync configurations keyed by id and unique per user and sync type
pub struct SqliteConfigurationStore {
    pool: SqlitePool,
}

impl SqliteConfigurationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn configuration_from_row(row: &SqliteRow) -> Result<SyncConfiguration, StoreError> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let sync_type: String = row.get("sync_type");
    let local_path: String = row.get("local_path");
    let remote_folder_id: String = row.get("remote_folder_id");
    let last_synced_at: Option<String> = row.get("last_synced_at");
    let created_at: String = row.get("created_at");

    Ok(SyncConfiguration {
        id: ConfigurationId::from_str(&id)?,
        user_id: UserId::new(user_id)?,
        sync_type: SyncType::new(sync_type)?,
        local_path: SyncPath::from_str(&local_path)?,
        remote_folder_id: ItemId::new(remote_folder_id)?,
        last_synced_at: parse_optional_datetime(last_synced_at)?,
        created_at: parse_datetime(&created_at)?,
    })
}

#[async_trait::async_trait]
impl IConfigurationStore for SqliteConfigurationStore {
    async fn get_configuration(
        &self,
        user: &UserId,
        sync_type: &SyncType,
    ) -> anyhow::Result<Option<SyncConfiguration>> {
        let row = sqlx::query(
            "SELECT id, user_id, sync_type, local_path, remote_folder_id, \
                    last_synced_at, created_at \
             FROM sync_configurations WHERE user_id = ? AND sync_type = ?",
        )
        .bind(user.as_str())
        .bind(sync_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        match row {
            Some(ref r) => Ok(Some(configuration_from_row(r)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, config), fields(id = %config.id, user = %config.user_id))]
    async fn save_configuration(&self, config: &SyncConfiguration) -> anyhow::Result<()> {
        // A second row for the same (user_id, sync_type) trips the UNIQUE constraint
        sqlx::query(
            "INSERT INTO sync_configurations \
             (id, user_id, sync_type, local_path, remote_folder_id, last_synced_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                 user_id = excluded.user_id, \
                 sync_type = excluded.sync_type, \
                 local_path = excluded.local_path, \
                 remote_folder_id = excluded.remote_folder_id, \
                 last_synced_at = excluded.last_synced_at",
        )
        .bind(config.id.to_string())
        .bind(config.user_id.as_str())
        .bind(config.sync_type.as_str())
        .bind(config.local_path.to_string())
        .bind(config.remote_folder_id.as_str())
        .bind(config.last_synced_at.map(|dt| dt.to_rfc3339()))
        .bind(config.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        info!("Saved sync configuration");
        Ok(())
    }

    async fn update_last_synced(
        &self,
        id: &ConfigurationId,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let result = sqlx::query("UPDATE sync_configurations SET last_synced_at = ? WHERE id = ?")
            .bind(at.to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;

        if result.rows_affected() == 0 {
            anyhow::bail!("No sync configuration with id {}", id);
        }
        Ok(())
    }
}
