//! Diff results between a local snapshot and the remote tree
//!
//! A [`DiffResult`] is a flat list of tagged [`DiffEntry`] values. Both
//! transfer directions read the same list; `added()`, `modified()` and
//! `removed()` are views filtered by tag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::DomainError;
use super::item::{LocalItem, RemoteItem};
use super::newtypes::SyncPath;

/// One difference between the two sides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiffEntry {
    /// Present locally, unknown remotely
    LocalOnly { local: LocalItem },
    /// Present remotely under a correlation key that has no local entry
    RemoteOnly { remote: RemoteItem },
    /// A file on both sides whose local copy is strictly newer
    Modified { local: LocalItem, remote: RemoteItem },
}

/// Coarse classification of a diff, shown to the user before a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    InSync,
    LocalAhead,
    RemoteAhead,
    Conflict,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::InSync => "in_sync",
            SyncAction::LocalAhead => "local_ahead",
            SyncAction::RemoteAhead => "remote_ahead",
            SyncAction::Conflict => "conflict",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side is authoritative for a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncDirection {
    /// Local tree wins: upload, create folders, delete remote-only items
    LocalToRemote,
    /// Remote tree wins: download, create directories, delete local-only items
    RemoteToLocal,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::LocalToRemote => f.write_str("local-to-remote"),
            SyncDirection::RemoteToLocal => f.write_str("remote-to-local"),
        }
    }
}

impl FromStr for SyncDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" | "local-to-remote" => Ok(SyncDirection::LocalToRemote),
            "pull" | "remote-to-local" => Ok(SyncDirection::RemoteToLocal),
            other => Err(DomainError::InvalidId(format!(
                "Unknown sync direction: {other}"
            ))),
        }
    }
}

/// Entry counts per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
}

impl DiffSummary {
    pub fn total(&self) -> usize {
        self.added + self.modified + self.removed
    }
}

/// The outcome of comparing one local snapshot against one remote tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Absolute local sync root the relative local paths hang off
    pub base: SyncPath,
    pub entries: Vec<DiffEntry>,
}

impl DiffResult {
    pub fn new(base: SyncPath, entries: Vec<DiffEntry>) -> Self {
        Self { base, entries }
    }

    /// An empty diff for `base`
    pub fn empty(base: SyncPath) -> Self {
        Self {
            base,
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Local-only items
    pub fn added(&self) -> impl Iterator<Item = &LocalItem> {
        self.entries.iter().filter_map(|e| match e {
            DiffEntry::LocalOnly { local } => Some(local),
            _ => None,
        })
    }

    /// Files present on both sides with a newer local copy
    pub fn modified(&self) -> impl Iterator<Item = (&LocalItem, &RemoteItem)> {
        self.entries.iter().filter_map(|e| match e {
            DiffEntry::Modified { local, remote } => Some((local, remote)),
            _ => None,
        })
    }

    /// Remote-only items
    pub fn removed(&self) -> impl Iterator<Item = &RemoteItem> {
        self.entries.iter().filter_map(|e| match e {
            DiffEntry::RemoteOnly { remote } => Some(remote),
            _ => None,
        })
    }

    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for entry in &self.entries {
            match entry {
                DiffEntry::LocalOnly { .. } => summary.added += 1,
                DiffEntry::Modified { .. } => summary.modified += 1,
                DiffEntry::RemoteOnly { .. } => summary.removed += 1,
            }
        }
        summary
    }

    /// Classify the diff
    ///
    /// `Conflict` requires both local-only and remote-only entries.
    /// `RemoteAhead` requires remote-only entries and nothing else.
    pub fn action(&self) -> SyncAction {
        let summary = self.summary();
        if summary.total() == 0 {
            SyncAction::InSync
        } else if summary.added > 0 && summary.removed > 0 {
            SyncAction::Conflict
        } else if summary.added == 0 && summary.modified == 0 {
            SyncAction::RemoteAhead
        } else {
            SyncAction::LocalAhead
        }
    }
}
