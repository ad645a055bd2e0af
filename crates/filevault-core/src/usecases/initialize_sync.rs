//! Sync initialization use case
//!
//! Ties a local directory to a remote root folder for a user and sync type.
//! Running it again for the same user and sync type returns the stored
//! configuration unchanged.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::{
    domain::{ItemId, NewItem, SyncConfiguration, SyncPath, SyncType, UserId},
    ports::{IConfigurationStore, IMetadataStore},
};

/// Use case for creating the persisted sync configuration
pub struct InitializeSyncUseCase {
    metadata: Arc<dyn IMetadataStore + Send + Sync>,
    configurations: Arc<dyn IConfigurationStore + Send + Sync>,
}

impl InitializeSyncUseCase {
    pub fn new(
        metadata: Arc<dyn IMetadataStore + Send + Sync>,
        configurations: Arc<dyn IConfigurationStore + Send + Sync>,
    ) -> Self {
        Self {
            metadata,
            configurations,
        }
    }

    /// Returns the configuration for `(user, sync_type)`, creating it if needed
    ///
    /// When no configuration exists yet:
    /// 1. Uses `remote_folder` as the remote root after checking it is a folder,
    ///    or creates a new root folder named after the local directory
    /// 2. Persists a configuration that has never been synced
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `remote_folder` does not exist or is not a folder
    /// - Either store fails
    #[tracing::instrument(skip(self), fields(user = %user, sync_type = %sync_type))]
    pub async fn execute(
        &self,
        user: &UserId,
        sync_type: &SyncType,
        local_path: &SyncPath,
        remote_folder: Option<ItemId>,
    ) -> Result<SyncConfiguration> {
        if let Some(existing) = self
            .configurations
            .get_configuration(user, sync_type)
            .await
            .context("Failed to look up sync configuration")?
        {
            info!(id = %existing.id, "Sync configuration already exists");
            return Ok(existing);
        }

        let root_id = match remote_folder {
            Some(id) => {
                let item = self
                    .metadata
                    .get_item(&id)
                    .await
                    .with_context(|| format!("Failed to fetch remote folder {id}"))?;
                match item {
                    Some(item) if item.is_folder() => item.id,
                    Some(_) => bail!("Remote item {id} is not a folder"),
                    None => bail!("Remote folder {id} does not exist"),
                }
            }
            None => {
                let name = local_path
                    .file_name()
                    .unwrap_or_else(|| "FileVault".to_string());
                let folder = NewItem::folder(user.clone(), None, name, None);
                self.metadata
                    .create_item(folder)
                    .await
                    .context("Failed to create remote root folder")?
            }
        };

        let config = SyncConfiguration::new(
            user.clone(),
            sync_type.clone(),
            local_path.clone(),
            root_id,
        );
        self.configurations
            .save_configuration(&config)
            .await
            .context("Failed to save sync configuration")?;

        info!(
            id = %config.id,
            local = %config.local_path,
            remote = %config.remote_folder_id,
            "Sync configuration created"
        );
        Ok(config)
    }
}
