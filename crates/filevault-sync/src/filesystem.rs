//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`ILocalFileSystem`] using `tokio::fs` for async file operations
//! and `walkdir` on a blocking thread for snapshots.
//!
//! ## Design Decisions
//!
//! - **Atomic writes**: Uses write-to-temp + rename to avoid partial writes
//!   on crash or power loss. Temp files carry [`TEMP_SUFFIX`] and are never
//!   reported by `scan_directory`.
//! - **Strict walks**: Any unreadable entry fails the whole scan.
//! - **Symlinks**: Reported only when followed; otherwise skipped.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Context;
use chrono::{DateTime, Utc};
use filevault_core::{
    domain::{item::LocalItem, newtypes::SyncPath},
    ports::local_filesystem::{FileSystemState, ILocalFileSystem},
};
use tracing::{debug, instrument};
use walkdir::WalkDir;

/// Suffix of the temporary files written during atomic writes
pub const TEMP_SUFFIX: &str = ".filevault-tmp";

// ============================================================================
// LocalFileSystemAdapter struct
// ============================================================================

/// Adapter that bridges the [`ILocalFileSystem`] port to the real filesystem.
///
/// This is a zero-sized struct because all operations derive their context
/// from the [`SyncPath`] arguments. Configuration (e.g. sync root) lives
/// at a higher layer.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystemAdapter;

impl LocalFileSystemAdapter {
    /// Create a new `LocalFileSystemAdapter`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}{TEMP_SUFFIX}"))
}

fn modified_of(metadata: &std::fs::Metadata) -> Option<DateTime<Utc>> {
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

/// Walks `root` and builds the flat snapshot
fn walk(root: &Path, follow_links: bool) -> anyhow::Result<Vec<LocalItem>> {
    let root_meta = std::fs::metadata(root)
        .with_context(|| format!("Cannot access sync root {}", root.display()))?;
    if !root_meta.is_dir() {
        anyhow::bail!("Sync root is not a directory: {}", root.display());
    }

    let mut items = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(follow_links)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;

        let name = entry.file_name().to_string_lossy();
        if name.ends_with(TEMP_SUFFIX) {
            continue;
        }

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            debug!(path = %entry.path().display(), "skipping symlink");
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("{} escaped the walk root", entry.path().display()))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        if file_type.is_dir() {
            items.push(LocalItem::folder(relative));
        } else if file_type.is_file() {
            let metadata = entry
                .metadata()
                .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
            items.push(LocalItem::file(
                relative,
                metadata.len(),
                modified_of(&metadata),
            ));
        }
    }

    Ok(items)
}

// ============================================================================
// ILocalFileSystem implementation
// ============================================================================

#[async_trait::async_trait]
impl ILocalFileSystem for LocalFileSystemAdapter {
    #[instrument(skip(self), fields(root = %root))]
    async fn scan_directory(
        &self,
        root: &SyncPath,
        follow_links: bool,
    ) -> anyhow::Result<Vec<LocalItem>> {
        let root_path = root.as_path().to_path_buf();
        let items = tokio::task::spawn_blocking(move || walk(&root_path, follow_links))
            .await
            .context("Directory walk task panicked")??;
        debug!(entries = items.len(), "scan complete");
        Ok(items)
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn read_file(&self, path: &SyncPath) -> anyhow::Result<Vec<u8>> {
        debug!("reading file");
        let data = tokio::fs::read(path.as_path())
            .await
            .with_context(|| format!("Failed to read {path}"))?;
        debug!(bytes = data.len(), "file read complete");
        Ok(data)
    }

    #[instrument(skip(self, data), fields(path = %path, bytes = data.len()))]
    async fn write_file(&self, path: &SyncPath, data: &[u8]) -> anyhow::Result<()> {
        let target = path.as_path();

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        // Same directory, so the rename stays on one filesystem.
        let tmp_path = temp_path_for(target);

        debug!(?tmp_path, "writing to temporary file");
        tokio::fs::write(&tmp_path, data)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;

        if let Err(e) = tokio::fs::rename(&tmp_path, target).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e).with_context(|| format!("Failed to replace {path}"));
        }

        debug!("write complete");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete_file(&self, path: &SyncPath) -> anyhow::Result<()> {
        tokio::fs::remove_file(path.as_path())
            .await
            .with_context(|| format!("Failed to delete {path}"))?;
        debug!("file deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete_directory(&self, path: &SyncPath) -> anyhow::Result<()> {
        tokio::fs::remove_dir_all(path.as_path())
            .await
            .with_context(|| format!("Failed to delete directory {path}"))?;
        debug!("directory deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn create_directory(&self, path: &SyncPath) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(path.as_path())
            .await
            .with_context(|| format!("Failed to create directory {path}"))?;
        debug!("directory created");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn get_state(&self, path: &SyncPath) -> anyhow::Result<FileSystemState> {
        let metadata = match tokio::fs::metadata(path.as_path()).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("path not found");
                return Ok(FileSystemState::not_found());
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to stat {path}")),
        };

        let is_file = metadata.is_file();
        let size = if is_file { metadata.len() } else { 0 };

        Ok(FileSystemState {
            exists: true,
            is_file,
            size,
            modified: modified_of(&metadata),
        })
    }

    #[instrument(skip(self), fields(path = %path, at = %at))]
    async fn set_modified(&self, path: &SyncPath, at: DateTime<Utc>) -> anyhow::Result<()> {
        let target = path.as_path().to_path_buf();
        let time = SystemTime::from(at);
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let file = std::fs::File::options().write(true).open(&target)?;
            file.set_modified(time)
        })
        .await
        .context("set_modified task panicked")?
        .with_context(|| format!("Failed to set modification time of {path}"))?;
        Ok(())
    }
}

// ============================================================================
// Unit tests
// ============================================================================
