//! Persisted sync configuration
//!
//! One [`SyncConfiguration`] ties a local directory to a remote root folder
//! for a given user and sync type. It is created once and afterwards only
//! its `last_synced_at` timestamp changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{ConfigurationId, ItemId, SyncPath, SyncType, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfiguration {
    pub id: ConfigurationId,
    pub user_id: UserId,
    pub sync_type: SyncType,
    /// Absolute local sync root
    pub local_path: SyncPath,
    /// Remote folder the local root is mirrored into
    pub remote_folder_id: ItemId,
    /// Completion time of the last successful pass
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SyncConfiguration {
    /// A configuration that has never been synced
    pub fn new(
        user_id: UserId,
        sync_type: SyncType,
        local_path: SyncPath,
        remote_folder_id: ItemId,
    ) -> Self {
        Self {
            id: ConfigurationId::new(),
            user_id,
            sync_type,
            local_path,
            remote_folder_id,
            last_synced_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn mark_synced(&mut self, at: DateTime<Utc>) {
        self.last_synced_at = Some(at);
    }

    pub fn has_synced(&self) -> bool {
        self.last_synced_at.is_some()
    }
}
