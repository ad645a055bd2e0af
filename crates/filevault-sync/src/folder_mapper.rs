//! Local folder to remote folder mapping
//!
//! The local side identifies folders by path, the remote side by opaque id.
//! [`FolderMapper::build`] reconciles the two for one pass: it reuses every
//! remote folder that already carries a correlation key and creates the
//! missing ones parent-before-child. The mapping is never persisted.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use filevault_core::domain::{ItemId, LocalItem, NewItem, SyncPath, UserId};
use filevault_core::ports::IMetadataStore;
use tracing::{debug, info, instrument};

use crate::remote_tree::{index_by_local_path, RemoteTree};
use crate::undo::UndoLog;
use crate::SyncError;

/// Absolute local folder path → remote folder id
#[derive(Debug, Clone)]
pub struct FolderMapping {
    root: SyncPath,
    root_id: ItemId,
    entries: HashMap<SyncPath, ItemId>,
}

impl FolderMapping {
    /// A mapping holding only the sync root
    pub fn new(root: SyncPath, root_id: ItemId) -> Self {
        let mut entries = HashMap::new();
        entries.insert(root.clone(), root_id.clone());
        Self {
            root,
            root_id,
            entries,
        }
    }

    pub fn root(&self) -> &SyncPath {
        &self.root
    }

    pub fn root_id(&self) -> &ItemId {
        &self.root_id
    }

    pub fn get(&self, path: &SyncPath) -> Option<&ItemId> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &SyncPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Remote folder that should contain `path`, falling back to the root
    pub fn parent_id_for(&self, path: &SyncPath) -> &ItemId {
        path.parent()
            .and_then(|parent| self.entries.get(&parent))
            .unwrap_or(&self.root_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SyncPath, &ItemId)> {
        self.entries.iter()
    }

    fn insert(&mut self, path: SyncPath, id: ItemId) -> Result<(), SyncError> {
        if let Some(existing) = self.entries.get(&path) {
            return Err(SyncError::FolderMapping(format!(
                "{path} maps to both {existing} and {id}"
            )));
        }
        self.entries.insert(path, id);
        Ok(())
    }
}

pub struct FolderMapper {
    metadata: Arc<dyn IMetadataStore + Send + Sync>,
    remote_tree: RemoteTree,
    owner: UserId,
}

impl FolderMapper {
    pub fn new(metadata: Arc<dyn IMetadataStore + Send + Sync>, owner: UserId) -> Self {
        Self {
            remote_tree: RemoteTree::new(metadata.clone()),
            metadata,
            owner,
        }
    }

    /// Build the mapping for one pass, creating missing remote folders
    ///
    /// Every created folder is recorded on `undo`. Validation happens before
    /// the first creation, so a mapping error never leaves folders behind.
    /// On a store failure the folders created so far stay on `undo` for the
    /// caller to roll back.
    ///
    /// # Errors
    /// - [`SyncError::FolderMapping`] on duplicate remote correlation keys
    ///   or a local folder whose parent is neither mapped nor scheduled
    /// - [`SyncError::Network`] / [`SyncError::Storage`] on store failures
    #[instrument(skip(self, local_items, undo), fields(base = %base, root = %root_remote_id))]
    pub async fn build(
        &self,
        local_items: &[LocalItem],
        base: &SyncPath,
        root_remote_id: &ItemId,
        undo: &mut UndoLog,
    ) -> Result<FolderMapping, SyncError> {
        let mut mapping = FolderMapping::new(base.clone(), root_remote_id.clone());

        let remote_folders = self.remote_tree.fetch_folders(root_remote_id).await?;
        for (path, folder) in index_by_local_path(&remote_folders)? {
            mapping.insert(path, folder.id.clone())?;
        }
        let reused = mapping.len() - 1;

        let mut missing = Vec::new();
        for item in local_items.iter().filter(|i| i.is_folder()) {
            let path = item.full_path(base)?;
            if !mapping.contains(&path) {
                missing.push(path);
            }
        }
        missing.sort_by(|a, b| a.depth().cmp(&b.depth()).then_with(|| a.cmp(b)));

        let mut scheduled: HashSet<&SyncPath> = HashSet::with_capacity(missing.len());
        for path in &missing {
            let parent = path.parent().ok_or_else(|| {
                SyncError::FolderMapping(format!("{path} has no parent folder"))
            })?;
            if !mapping.contains(&parent) && !scheduled.contains(&parent) {
                return Err(SyncError::FolderMapping(format!(
                    "parent of {path} is neither mapped nor present locally"
                )));
            }
            scheduled.insert(path);
        }

        for path in &missing {
            let parent_id = mapping.parent_id_for(path).clone();
            let name = path.file_name().unwrap_or_default();
            let folder = NewItem::folder(
                self.owner.clone(),
                Some(parent_id),
                name,
                Some(path.clone()),
            );

            let id = self
                .metadata
                .create_item(folder)
                .await
                .map_err(|e| SyncError::remote(format!("Failed to create folder for {path}"), &e))?;
            undo.record_item(self.metadata.clone(), id.clone());
            debug!(path = %path, id = %id, "remote folder created");
            mapping.insert(path.clone(), id)?;
        }

        info!(reused, created = missing.len(), "Folder mapping built");
        Ok(mapping)
    }
}
