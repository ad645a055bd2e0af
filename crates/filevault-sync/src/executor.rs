//! Directional transfer
//!
//! [`SyncExecutor`] applies a [`DiffResult`] in one direction.
//!
//! ## Local to remote
//!
//! 1. Refresh the remote index so every mutation is checked against the
//!    current remote state
//! 2. Delete remote-only items (payloads first, then records, deepest first)
//! 3. Upload local-only and modified files, replacing older records
//!
//! Every created payload and record goes on the pass's [`UndoLog`]. Any
//! error unwinds the log before it is returned.
//!
//! ## Remote to local
//!
//! Deletes local-only entries, downloads modified and remote-only files and
//! stamps them with the remote modification time. Only the local side is
//! touched.
//!
//! Re-running either direction against an applied diff performs no mutation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use filevault_core::domain::{
    DiffEntry, DiffResult, ItemId, LocalItem, NewItem, RemoteItem, SyncPath, UserId,
};
use filevault_core::ports::{ILocalFileSystem, IMetadataStore, IObjectStore};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::folder_mapper::FolderMapping;
use crate::progress::ProgressReporter;
use crate::remote_tree::{index_by_local_path, RemoteTree};
use crate::undo::UndoLog;
use crate::SyncError;

/// Counts of what a pass actually changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub uploaded: usize,
    pub downloaded: usize,
    pub deleted_remote: usize,
    pub deleted_local: usize,
    pub created_directories: usize,
    pub skipped: usize,
}

impl ExecutionReport {
    /// Total number of mutations
    pub fn changes(&self) -> usize {
        self.uploaded
            + self.downloaded
            + self.deleted_remote
            + self.deleted_local
            + self.created_directories
    }
}

pub struct SyncExecutor {
    filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
    metadata: Arc<dyn IMetadataStore + Send + Sync>,
    objects: Arc<dyn IObjectStore + Send + Sync>,
    remote_tree: RemoteTree,
    owner: UserId,
}

impl SyncExecutor {
    pub fn new(
        filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
        metadata: Arc<dyn IMetadataStore + Send + Sync>,
        objects: Arc<dyn IObjectStore + Send + Sync>,
        owner: UserId,
    ) -> Self {
        Self {
            filesystem,
            remote_tree: RemoteTree::new(metadata.clone()),
            metadata,
            objects,
            owner,
        }
    }

    // ========================================================================
    // Local to remote
    // ========================================================================

    /// Make the remote tree match the local snapshot the diff was built from
    ///
    /// `undo` may already hold entries, typically the folders created by
    /// [`crate::folder_mapper::FolderMapper::build`]; they are rolled back
    /// together with everything created here. On success the log is
    /// committed.
    #[instrument(skip_all, fields(base = %diff.base, root = %mapping.root_id()))]
    pub async fn execute_local_to_remote(
        &self,
        diff: &DiffResult,
        mapping: &FolderMapping,
        undo: &mut UndoLog,
        progress: &ProgressReporter,
    ) -> Result<ExecutionReport, SyncError> {
        match self.push(diff, mapping, undo, progress).await {
            Ok(report) => {
                undo.commit();
                info!(
                    uploaded = report.uploaded,
                    deleted = report.deleted_remote,
                    skipped = report.skipped,
                    "Local to remote pass complete"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, steps = undo.len(), "Local to remote pass failed, rolling back");
                undo.rollback().await;
                Err(e)
            }
        }
    }

    async fn push(
        &self,
        diff: &DiffResult,
        mapping: &FolderMapping,
        undo: &mut UndoLog,
        progress: &ProgressReporter,
    ) -> Result<ExecutionReport, SyncError> {
        let mut report = ExecutionReport::default();

        let current = self.remote_tree.fetch(mapping.root_id(), true).await?;
        let index = index_by_local_path(&current)?;
        let live_ids: HashSet<&ItemId> = current.iter().map(|item| &item.id).collect();
        let mut deleted_ids: HashSet<ItemId> = HashSet::new();

        for remote in diff.removed() {
            progress.check_cancelled()?;
            if !live_ids.contains(&remote.id) || deleted_ids.contains(&remote.id) {
                report.skipped += 1;
                continue;
            }
            if remote.is_folder() {
                self.delete_remote_folder(remote, &mut deleted_ids).await?;
            } else {
                self.delete_remote_file(remote).await?;
                deleted_ids.insert(remote.id.clone());
            }
            report.deleted_remote += 1;
        }

        let uploads: Vec<&LocalItem> = diff
            .entries
            .iter()
            .filter_map(|entry| match entry {
                DiffEntry::LocalOnly { local } | DiffEntry::Modified { local, .. } => Some(local),
                DiffEntry::RemoteOnly { .. } => None,
            })
            .filter(|local| !local.is_folder())
            .collect();
        let total = uploads.len();
        let mut replaced: Vec<&RemoteItem> = Vec::new();

        for (position, local) in uploads.into_iter().enumerate() {
            progress.check_cancelled()?;
            let path = local.full_path(&diff.base)?;
            let existing = index.get(&path).copied();

            if existing.is_some_and(|remote| is_up_to_date(local.last_modified, remote)) {
                debug!(path = %path, "remote copy already current");
                report.skipped += 1;
            } else {
                self.upload(local, &path, mapping, undo).await?;
                replaced.extend(existing);
                report.uploaded += 1;
            }
            progress.report(path.to_string(), position + 1, total);
        }

        // Superseded copies are not undoable, so they go after the last upload
        for old in replaced {
            self.delete_remote_file(old).await?;
            debug!(old = %old.id, name = %old.name, "replaced record removed");
        }

        Ok(report)
    }

    async fn upload(
        &self,
        local: &LocalItem,
        path: &SyncPath,
        mapping: &FolderMapping,
        undo: &mut UndoLog,
    ) -> Result<(), SyncError> {
        let data = self
            .filesystem
            .read_file(path)
            .await
            .map_err(|e| SyncError::io(format!("Failed to read {path}"), &e))?;
        let size = data.len() as u64;

        let id = ItemId::generate();
        let key = self
            .objects
            .store(&self.owner, &id, &local.name, data)
            .await
            .map_err(|e| SyncError::remote(format!("Failed to store {path}"), &e))?;
        undo.record_object(self.objects.clone(), key.clone(), local.name.clone());

        let record = NewItem::file(
            id,
            self.owner.clone(),
            mapping.parent_id_for(path).clone(),
            local.name.clone(),
            key,
            path.clone(),
            Some(size),
            local.last_modified,
        );
        let created = self
            .metadata
            .create_item(record)
            .await
            .map_err(|e| SyncError::remote(format!("Failed to create record for {path}"), &e))?;
        undo.record_item(self.metadata.clone(), created.clone());
        debug!(path = %path, id = %created, bytes = size, "uploaded");
        Ok(())
    }

    async fn delete_remote_file(&self, item: &RemoteItem) -> Result<(), SyncError> {
        if let Some(key) = &item.storage_key {
            self.objects
                .remove(key, &item.name)
                .await
                .map_err(|e| SyncError::remote(format!("Failed to remove object {key}"), &e))?;
        }
        self.metadata
            .delete_item(&item.id)
            .await
            .map_err(|e| SyncError::remote(format!("Failed to delete item {}", item.id), &e))?;
        Ok(())
    }

    /// Payloads of every descendant, then descendant records deepest first,
    /// then the folder itself
    async fn delete_remote_folder(
        &self,
        folder: &RemoteItem,
        deleted_ids: &mut HashSet<ItemId>,
    ) -> Result<(), SyncError> {
        let descendants = self.remote_tree.fetch(&folder.id, true).await?;

        for item in descendants.iter().filter(|i| !i.is_folder()) {
            if let Some(key) = &item.storage_key {
                self.objects
                    .remove(key, &item.name)
                    .await
                    .map_err(|e| SyncError::remote(format!("Failed to remove object {key}"), &e))?;
            }
        }

        let mut ordered: Vec<(usize, &RemoteItem)> = descendants
            .iter()
            .map(|item| (depth_below(item, &folder.id, &descendants), item))
            .collect();
        ordered.sort_by(|a, b| b.0.cmp(&a.0));

        for (_, item) in ordered {
            self.metadata
                .delete_item(&item.id)
                .await
                .map_err(|e| SyncError::remote(format!("Failed to delete item {}", item.id), &e))?;
            deleted_ids.insert(item.id.clone());
        }

        self.metadata
            .delete_item(&folder.id)
            .await
            .map_err(|e| SyncError::remote(format!("Failed to delete folder {}", folder.id), &e))?;
        deleted_ids.insert(folder.id.clone());
        debug!(folder = %folder.id, descendants = descendants.len(), "remote folder deleted");
        Ok(())
    }

    // ========================================================================
    // Remote to local
    // ========================================================================

    /// Make the local tree match the remote tree the diff was built from
    #[instrument(skip_all, fields(base = %local_base))]
    pub async fn execute_remote_to_local(
        &self,
        diff: &DiffResult,
        local_base: &SyncPath,
        progress: &ProgressReporter,
    ) -> Result<ExecutionReport, SyncError> {
        let mut report = ExecutionReport::default();
        let total = diff.entries.len();

        for (position, entry) in diff.entries.iter().enumerate() {
            progress.check_cancelled()?;
            let path = match entry {
                DiffEntry::LocalOnly { local } => {
                    let path = local.full_path(local_base)?;
                    self.remove_local(&path, &mut report).await?;
                    path
                }
                DiffEntry::Modified { local, remote } => {
                    let path = local.full_path(local_base)?;
                    self.download(remote, &path, &mut report).await?;
                    path
                }
                DiffEntry::RemoteOnly { remote } => {
                    let path = target_path(remote, local_base)?;
                    if remote.is_folder() {
                        self.create_local_directory(&path, &mut report).await?;
                    } else {
                        self.download(remote, &path, &mut report).await?;
                    }
                    path
                }
            };
            progress.report(path.to_string(), position + 1, total);
        }

        info!(
            downloaded = report.downloaded,
            deleted = report.deleted_local,
            directories = report.created_directories,
            skipped = report.skipped,
            "Remote to local pass complete"
        );
        Ok(report)
    }

    async fn remove_local(
        &self,
        path: &SyncPath,
        report: &mut ExecutionReport,
    ) -> Result<(), SyncError> {
        let state = self.state_of(path).await?;
        if !state.exists {
            report.skipped += 1;
            return Ok(());
        }
        let result = if state.is_directory() {
            self.filesystem.delete_directory(path).await
        } else {
            self.filesystem.delete_file(path).await
        };
        result.map_err(|e| SyncError::io(format!("Failed to delete {path}"), &e))?;
        report.deleted_local += 1;
        Ok(())
    }

    async fn create_local_directory(
        &self,
        path: &SyncPath,
        report: &mut ExecutionReport,
    ) -> Result<(), SyncError> {
        if self.state_of(path).await?.is_directory() {
            report.skipped += 1;
            return Ok(());
        }
        self.filesystem
            .create_directory(path)
            .await
            .map_err(|e| SyncError::io(format!("Failed to create {path}"), &e))?;
        report.created_directories += 1;
        Ok(())
    }

    async fn download(
        &self,
        remote: &RemoteItem,
        path: &SyncPath,
        report: &mut ExecutionReport,
    ) -> Result<(), SyncError> {
        let state = self.state_of(path).await?;
        if state.is_regular_file()
            && remote.last_modified.is_some()
            && state.modified == remote.last_modified
        {
            report.skipped += 1;
            return Ok(());
        }

        let key = remote.storage_key.as_ref().ok_or_else(|| {
            SyncError::Storage(format!("remote file {} has no stored payload", remote.id))
        })?;
        let data = self
            .objects
            .retrieve(key)
            .await
            .map_err(|e| SyncError::remote(format!("Failed to download {key}"), &e))?;

        self.filesystem
            .write_file(path, &data)
            .await
            .map_err(|e| SyncError::io(format!("Failed to write {path}"), &e))?;
        if let Some(at) = remote.last_modified {
            self.filesystem
                .set_modified(path, at)
                .await
                .map_err(|e| SyncError::io(format!("Failed to stamp {path}"), &e))?;
        }
        debug!(path = %path, bytes = data.len(), "downloaded");
        report.downloaded += 1;
        Ok(())
    }

    async fn state_of(
        &self,
        path: &SyncPath,
    ) -> Result<filevault_core::ports::FileSystemState, SyncError> {
        self.filesystem
            .get_state(path)
            .await
            .map_err(|e| SyncError::io(format!("Failed to stat {path}"), &e))
    }
}

/// A remote record is current when it is at least as new as the local file
fn is_up_to_date(local_modified: Option<DateTime<Utc>>, remote: &RemoteItem) -> bool {
    match (local_modified, remote.last_modified) {
        (Some(local), Some(remote)) => remote >= local,
        _ => false,
    }
}

/// Local destination of a remote-only item, which must lie under `base`
fn target_path(remote: &RemoteItem, base: &SyncPath) -> Result<SyncPath, SyncError> {
    let local_path = remote.local_path.as_ref().ok_or_else(|| {
        SyncError::FolderMapping(format!("remote item {} has no local path", remote.id))
    })?;
    Ok(SyncPath::new_within_root(
        local_path.as_path().to_path_buf(),
        base,
    )?)
}

/// Number of parent hops from `item` up to `ancestor`
fn depth_below(item: &RemoteItem, ancestor: &ItemId, items: &[RemoteItem]) -> usize {
    let parents: HashMap<&ItemId, Option<&ItemId>> = items
        .iter()
        .map(|i| (&i.id, i.parent_id.as_ref()))
        .collect();

    let mut depth = 1;
    let mut current = item.parent_id.as_ref();
    while let Some(parent) = current {
        if parent == ancestor || depth > items.len() {
            break;
        }
        depth += 1;
        current = parents.get(parent).copied().flatten();
    }
    depth
}
