//! Snapshot comparison
//!
//! Local items are keyed by `base/<path>`, remote items by their correlation
//! key. The comparison is purely structural plus one timestamp rule: a file
//! is modified only when both sides carry a timestamp and the local one is
//! strictly newer.

use std::collections::HashSet;

use filevault_core::domain::{DiffEntry, DiffResult, LocalItem, RemoteItem, SyncPath};
use tracing::debug;

use crate::remote_tree::index_by_local_path;
use crate::SyncError;

pub struct DiffEngine;

impl DiffEngine {
    /// Compare a local snapshot against the remote tree under `base`
    ///
    /// Entries come out in local path order, followed by remote-only items
    /// in correlation key order.
    ///
    /// # Errors
    /// - [`SyncError::FolderMapping`] on duplicate remote correlation keys
    /// - [`SyncError::Domain`] if a local path cannot be joined to `base`
    pub fn compare(
        base: &SyncPath,
        local_items: &[LocalItem],
        remote_items: &[RemoteItem],
    ) -> Result<DiffResult, SyncError> {
        let remote_index = index_by_local_path(remote_items)?;
        let mut entries = Vec::new();
        let mut seen = HashSet::with_capacity(local_items.len());

        for local in local_items {
            let key = local.full_path(base)?;
            match remote_index.get(&key) {
                None => entries.push(DiffEntry::LocalOnly {
                    local: local.clone(),
                }),
                Some(remote) => {
                    if is_newer_locally(local, remote) {
                        entries.push(DiffEntry::Modified {
                            local: local.clone(),
                            remote: (*remote).clone(),
                        });
                    }
                }
            }
            seen.insert(key);
        }

        let mut remote_only: Vec<&RemoteItem> = remote_index
            .iter()
            .filter(|(key, _)| !seen.contains(*key))
            .map(|(_, item)| *item)
            .collect();
        remote_only.sort_by(|a, b| a.local_path.cmp(&b.local_path));
        entries.extend(remote_only.into_iter().map(|remote| DiffEntry::RemoteOnly {
            remote: remote.clone(),
        }));

        let diff = DiffResult::new(base.clone(), entries);
        let summary = diff.summary();
        debug!(
            added = summary.added,
            modified = summary.modified,
            removed = summary.removed,
            action = %diff.action(),
            "diff computed"
        );
        Ok(diff)
    }
}

fn is_newer_locally(local: &LocalItem, remote: &RemoteItem) -> bool {
    if local.is_folder() {
        return false;
    }
    match (local.last_modified, remote.last_modified) {
        (Some(local_time), Some(remote_time)) => local_time > remote_time,
        _ => false,
    }
}
