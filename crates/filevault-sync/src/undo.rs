//! Rollback log for remote artifacts created during a pass
//!
//! Every object payload, metadata record or folder created while pushing
//! local changes is recorded here together with the action that removes it.
//! On failure the log is unwound newest first. Cleanup failures are logged
//! and never replace the error that triggered the rollback.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use filevault_core::domain::{ItemId, StorageKey};
use filevault_core::ports::{IMetadataStore, IObjectStore};
use tracing::{debug, info, warn};

type UndoFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type UndoAction = Box<dyn FnOnce() -> UndoFuture + Send>;

struct UndoEntry {
    description: String,
    action: UndoAction,
}

/// Ordered stack of compensating actions
#[derive(Default)]
pub struct UndoLog {
    entries: Vec<UndoEntry>,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a compensating action
    pub fn push<F, Fut>(&mut self, description: impl Into<String>, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let description = description.into();
        debug!(%description, "undo entry recorded");
        self.entries.push(UndoEntry {
            description,
            action: Box::new(move || Box::pin(action())),
        });
    }

    /// Records the removal of a freshly created metadata record
    pub fn record_item(&mut self, metadata: Arc<dyn IMetadataStore + Send + Sync>, id: ItemId) {
        self.push(format!("delete item {id}"), move || async move {
            metadata.delete_item(&id).await
        });
    }

    /// Records the removal of a freshly stored payload
    pub fn record_object(
        &mut self,
        objects: Arc<dyn IObjectStore + Send + Sync>,
        key: StorageKey,
        name: String,
    ) {
        self.push(format!("remove object {key}"), move || async move {
            objects.remove(&key, &name).await
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptions in creation order
    pub fn descriptions(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.description.as_str()).collect()
    }

    /// Forgets every entry; the recorded artifacts are kept
    pub fn commit(&mut self) {
        if !self.entries.is_empty() {
            debug!(entries = self.entries.len(), "undo log committed");
        }
        self.entries.clear();
    }

    /// Runs every compensating action, newest first
    ///
    /// Returns the number of actions that failed.
    pub async fn rollback(&mut self) -> usize {
        let total = self.entries.len();
        let mut failures = 0;

        while let Some(entry) = self.entries.pop() {
            if let Err(e) = (entry.action)().await {
                failures += 1;
                warn!(action = %entry.description, error = %e, "Rollback step failed");
            }
        }

        if total > 0 {
            info!(steps = total, failures, "Rollback complete");
        }
        failures
    }
}

impl std::fmt::Debug for UndoLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoLog")
            .field("entries", &self.descriptions())
            .finish()
    }
}
