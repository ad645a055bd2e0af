//! Sync configuration store port (driven/secondary port)
//!
//! Persists [`SyncConfiguration`]s, at most one per user and sync type.

use chrono::{DateTime, Utc};

use crate::domain::configuration::SyncConfiguration;
use crate::domain::newtypes::{ConfigurationId, SyncType, UserId};

/// Port trait for sync configuration persistence
#[async_trait::async_trait]
pub trait IConfigurationStore: Send + Sync {
    /// Looks up the configuration of `user` for `sync_type`
    async fn get_configuration(
        &self,
        user: &UserId,
        sync_type: &SyncType,
    ) -> anyhow::Result<Option<SyncConfiguration>>;

    /// Inserts a configuration, or replaces the one with the same id
    ///
    /// # Errors
    /// Returns an error if a different configuration already exists for the
    /// same user and sync type
    async fn save_configuration(&self, config: &SyncConfiguration) -> anyhow::Result<()>;

    /// Records the completion time of a successful pass
    async fn update_last_synced(
        &self,
        id: &ConfigurationId,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}
