//! Remote tree fetches
//!
//! Thin wrapper over [`IMetadataStore::list_items`] that classifies store
//! failures and indexes items by their correlation key.

use std::collections::HashMap;
use std::sync::Arc;

use filevault_core::domain::{ItemId, RemoteItem, SyncPath};
use filevault_core::ports::IMetadataStore;
use tracing::{debug, instrument};

use crate::SyncError;

#[derive(Clone)]
pub struct RemoteTree {
    metadata: Arc<dyn IMetadataStore + Send + Sync>,
}

impl RemoteTree {
    pub fn new(metadata: Arc<dyn IMetadataStore + Send + Sync>) -> Self {
        Self { metadata }
    }

    /// Every item below `root`, each carrying its correlation key if recorded
    #[instrument(skip(self), fields(root = %root))]
    pub async fn fetch(&self, root: &ItemId, recursive: bool) -> Result<Vec<RemoteItem>, SyncError> {
        let items = self
            .metadata
            .list_items(root, recursive)
            .await
            .map_err(|e| SyncError::remote(format!("Failed to list items under {root}"), &e))?;
        debug!(items = items.len(), "remote fetch complete");
        Ok(items)
    }

    /// Every folder below `root`
    pub async fn fetch_folders(&self, root: &ItemId) -> Result<Vec<RemoteItem>, SyncError> {
        let mut items = self.fetch(root, true).await?;
        items.retain(RemoteItem::is_folder);
        Ok(items)
    }
}

/// Indexes remote items by correlation key
///
/// Items without a key are left out.
///
/// # Errors
/// Returns [`SyncError::FolderMapping`] if two items carry the same key
pub fn index_by_local_path(
    items: &[RemoteItem],
) -> Result<HashMap<SyncPath, &RemoteItem>, SyncError> {
    let mut index = HashMap::with_capacity(items.len());
    for item in items {
        let Some(local_path) = &item.local_path else {
            continue;
        };
        if let Some(previous) = index.insert(local_path.clone(), item) {
            return Err(SyncError::FolderMapping(format!(
                "remote items {} and {} both map to {}",
                previous.id, item.id, local_path
            )));
        }
    }
    Ok(index)
}
