//! Local filesystem port (driven/secondary port)
//!
//! This module defines the interface for interacting with the local sync
//! root: walking it into a snapshot, reading and writing file contents,
//! and applying remote-authoritative changes.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because filesystem errors are adapter-specific.
//! - All paths are `SyncPath` instances, which are guaranteed to be absolute.
//! - Snapshot paths are relative to the scanned root and `/`-separated.

use chrono::{DateTime, Utc};

use crate::domain::item::LocalItem;
use crate::domain::newtypes::SyncPath;

// ============================================================================
// FileSystemState struct
// ============================================================================

/// Snapshot of a single path's state on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemState {
    /// Whether the file/directory exists on disk
    pub exists: bool,
    /// Whether this is a regular file (false for directories and other types)
    pub is_file: bool,
    /// Size in bytes (0 for directories or non-existent files)
    pub size: u64,
    /// Last modification time (None if not available or file doesn't exist)
    pub modified: Option<DateTime<Utc>>,
}

impl FileSystemState {
    /// Returns a state representing a non-existent path
    pub fn not_found() -> Self {
        Self {
            exists: false,
            is_file: false,
            size: 0,
            modified: None,
        }
    }

    /// Returns true if the file exists and is a regular file
    pub fn is_regular_file(&self) -> bool {
        self.exists && self.is_file
    }

    /// Returns true if the file exists and is a directory
    pub fn is_directory(&self) -> bool {
        self.exists && !self.is_file
    }
}

// ============================================================================
// ILocalFileSystem trait
// ============================================================================

/// Port trait for local filesystem operations
///
/// ## Implementation Notes
///
/// - `scan_directory` must fail, not skip, when any entry under the root
///   cannot be read. A partial snapshot would be diffed as deletions.
/// - `write_file` must be atomic: readers see either the old or the new
///   contents, never a truncated file.
#[async_trait::async_trait]
pub trait ILocalFileSystem: Send + Sync {
    /// Recursively lists every entry under `root`, excluding `root` itself
    ///
    /// # Arguments
    /// * `root` - Directory to walk
    /// * `follow_links` - Whether symbolic links are followed
    ///
    /// # Errors
    /// Returns an error if the root or any subpath is inaccessible
    async fn scan_directory(
        &self,
        root: &SyncPath,
        follow_links: bool,
    ) -> anyhow::Result<Vec<LocalItem>>;

    /// Reads the entire contents of a file
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be read
    async fn read_file(&self, path: &SyncPath) -> anyhow::Result<Vec<u8>>;

    /// Writes data to a file, creating it and its parent directories if needed
    ///
    /// If the file already exists, its contents are replaced.
    async fn write_file(&self, path: &SyncPath, data: &[u8]) -> anyhow::Result<()>;

    /// Deletes a file from the filesystem
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be deleted
    async fn delete_file(&self, path: &SyncPath) -> anyhow::Result<()>;

    /// Deletes a directory and everything below it
    async fn delete_directory(&self, path: &SyncPath) -> anyhow::Result<()>;

    /// Creates a directory and all parent directories as needed
    ///
    /// This is equivalent to `mkdir -p` behavior.
    async fn create_directory(&self, path: &SyncPath) -> anyhow::Result<()>;

    /// Gets the current state of a file or directory
    ///
    /// Returns `FileSystemState::not_found()` if the path doesn't exist
    /// (does not return an error for missing paths).
    async fn get_state(&self, path: &SyncPath) -> anyhow::Result<FileSystemState>;

    /// Sets the modification time of an existing file
    async fn set_modified(&self, path: &SyncPath, at: DateTime<Utc>) -> anyhow::Result<()>;
}
