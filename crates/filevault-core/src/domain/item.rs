//! Local and remote item snapshots
//!
//! A sync pass works on two flat snapshots: [`LocalItem`]s produced by walking
//! the local sync root, and [`RemoteItem`]s fetched from the metadata store.
//! The two sides are correlated through [`RemoteItem::local_path`], the
//! absolute local path recorded when the remote item was created by a sync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::DomainError;
use super::newtypes::{ItemId, StorageKey, SyncPath, UserId};

/// Whether an entry is a regular file or a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    File,
    Folder,
}

impl ItemKind {
    /// Stable lowercase label, also used as the database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::File => "file",
            ItemKind::Folder => "folder",
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, ItemKind::Folder)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(ItemKind::File),
            "folder" => Ok(ItemKind::Folder),
            other => Err(DomainError::InvalidItemKind(other.to_string())),
        }
    }
}

// ============================================================================
// LocalItem
// ============================================================================

/// One entry of a local snapshot
///
/// `path` is relative to the sync root and `/`-separated; it never starts
/// with a separator and never names the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalItem {
    pub path: String,
    pub name: String,
    pub kind: ItemKind,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl LocalItem {
    /// A file entry
    pub fn file(
        path: impl Into<String>,
        size: u64,
        last_modified: Option<DateTime<Utc>>,
    ) -> Self {
        let path = path.into();
        Self {
            name: last_segment(&path),
            path,
            kind: ItemKind::File,
            size: Some(size),
            last_modified,
        }
    }

    /// A folder entry
    pub fn folder(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: last_segment(&path),
            path,
            kind: ItemKind::Folder,
            size: None,
            last_modified: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    /// Absolute location of this entry under `base`
    ///
    /// # Errors
    /// Returns error if `path` is empty, absolute, or contains `..`
    pub fn full_path(&self, base: &SyncPath) -> Result<SyncPath, DomainError> {
        base.join(&self.path)
    }
}

fn last_segment(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

// ============================================================================
// RemoteItem
// ============================================================================

/// One entry of the remote tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: ItemId,
    pub parent_id: Option<ItemId>,
    pub kind: ItemKind,
    pub name: String,
    /// Object-store reference; files only
    pub storage_key: Option<StorageKey>,
    /// Correlation key recorded when the item was created by a sync
    pub local_path: Option<SyncPath>,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl RemoteItem {
    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }
}

// ============================================================================
// NewItem
// ============================================================================

/// A metadata record about to be created
///
/// The id is allocated by the caller so that object payloads can be stored
/// under it before the record exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub id: ItemId,
    pub owner: UserId,
    pub parent_id: Option<ItemId>,
    pub kind: ItemKind,
    pub name: String,
    pub storage_key: Option<StorageKey>,
    pub local_path: Option<SyncPath>,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl NewItem {
    /// A folder record with a freshly generated id
    pub fn folder(
        owner: UserId,
        parent_id: Option<ItemId>,
        name: impl Into<String>,
        local_path: Option<SyncPath>,
    ) -> Self {
        Self {
            id: ItemId::generate(),
            owner,
            parent_id,
            kind: ItemKind::Folder,
            name: name.into(),
            storage_key: None,
            local_path,
            size: None,
            last_modified: None,
        }
    }

    /// A file record pointing at an already-stored payload
    #[allow(clippy::too_many_arguments)]
    pub fn file(
        id: ItemId,
        owner: UserId,
        parent_id: ItemId,
        name: impl Into<String>,
        storage_key: StorageKey,
        local_path: SyncPath,
        size: Option<u64>,
        last_modified: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            owner,
            parent_id: Some(parent_id),
            kind: ItemKind::File,
            name: name.into(),
            storage_key: Some(storage_key),
            local_path: Some(local_path),
            size,
            last_modified,
        }
    }

    /// The remote item this record becomes once created
    pub fn into_remote(self) -> RemoteItem {
        RemoteItem {
            id: self.id,
            parent_id: self.parent_id,
            kind: self.kind,
            name: self.name,
            storage_key: self.storage_key,
            local_path: self.local_path,
            size: self.size,
            last_modified: self.last_modified,
        }
    }
}
