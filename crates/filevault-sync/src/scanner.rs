//! Local snapshot scanner
//!
//! Wraps [`ILocalFileSystem::scan_directory`] with ignore patterns and a
//! deterministic ordering. Ignoring a folder hides everything below it.

use std::sync::Arc;

use filevault_core::config::ScanConfig;
use filevault_core::domain::{LocalItem, SyncPath};
use filevault_core::ports::ILocalFileSystem;
use glob::Pattern;
use tracing::{debug, info, instrument, warn};

use crate::SyncError;

/// Compiles entry-name globs, logging and skipping any that do not parse
pub fn compile_ignore_patterns(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|raw| match Pattern::new(raw) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!(pattern = %raw, error = %e, "Skipping invalid ignore pattern");
                None
            }
        })
        .collect()
}

/// Produces flat snapshots of a local sync root
pub struct LocalScanner {
    filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
    ignore: Vec<Pattern>,
    follow_links: bool,
}

impl LocalScanner {
    /// A scanner with no ignore patterns that does not follow links
    pub fn new(filesystem: Arc<dyn ILocalFileSystem + Send + Sync>) -> Self {
        Self {
            filesystem,
            ignore: Vec::new(),
            follow_links: false,
        }
    }

    pub fn with_config(
        filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
        config: &ScanConfig,
    ) -> Self {
        Self {
            filesystem,
            ignore: compile_ignore_patterns(&config.ignore),
            follow_links: config.follow_links,
        }
    }

    fn is_ignored(&self, relative: &str) -> bool {
        relative
            .split('/')
            .any(|segment| self.ignore.iter().any(|p| p.matches(segment)))
    }

    /// Snapshot every entry under `root`, sorted by path
    ///
    /// # Errors
    /// Returns [`SyncError::Io`] if the root or any subpath is inaccessible
    #[instrument(skip(self), fields(root = %root))]
    pub async fn scan(&self, root: &SyncPath) -> Result<Vec<LocalItem>, SyncError> {
        let items = self
            .filesystem
            .scan_directory(root, self.follow_links)
            .await
            .map_err(|e| SyncError::io(format!("Failed to scan {root}"), &e))?;

        let total = items.len();
        let mut items: Vec<LocalItem> = items
            .into_iter()
            .filter(|item| !self.is_ignored(&item.path))
            .collect();
        items.sort_by(|a, b| a.path.cmp(&b.path));

        if items.len() < total {
            debug!(ignored = total - items.len(), "entries matched ignore patterns");
        }
        info!(items = items.len(), "Local scan complete");
        Ok(items)
    }
}
