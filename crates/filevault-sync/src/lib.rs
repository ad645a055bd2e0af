//! FileVault Sync - Snapshot diffing and directional synchronization
//!
//! Provides:
//! - Local snapshots and remote tree fetches
//! - Diffing with a coarse in-sync / ahead / conflict classification
//! - Folder mapping between local paths and remote folder ids
//! - Directional transfer with rollback of partially created remote artifacts
//! - A polling orchestrator that asks a human which side wins
//!
//! ## Modules
//!
//! - [`scanner`] - Local snapshot with ignore patterns
//! - [`remote_tree`] - Recursive remote fetch
//! - [`diff`] - Snapshot comparison
//! - [`folder_mapper`] - Path to remote folder id mapping
//! - [`undo`] - Rollback log
//! - [`progress`] - Progress channel and cancellation
//! - [`executor`] - Transfers in either direction
//! - [`orchestrator`] - Polling state machine
//! - [`filesystem`] - Local filesystem adapter (walkdir snapshots, atomic writes)

pub mod diff;
pub mod executor;
pub mod filesystem;
pub mod folder_mapper;
pub mod orchestrator;
pub mod progress;
pub mod remote_tree;
pub mod scanner;
pub mod undo;

use filevault_core::domain::errors::DomainError;
use thiserror::Error;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// A local filesystem operation failed
    #[error("IO error: {0}")]
    Io(String),

    /// A remote store could not be reached or answered with a transient failure
    #[error("Network error: {0}")]
    Network(String),

    /// A remote store rejected or failed an operation
    #[error("Storage error: {0}")]
    Storage(String),

    /// The local and remote hierarchies cannot be reconciled
    #[error("Folder mapping error: {0}")]
    FolderMapping(String),

    /// The pass was cancelled before completion
    #[error("Sync cancelled")]
    Cancelled,

    /// Persisted or file configuration is unusable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A domain-level error propagated from filevault-core
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl SyncError {
    /// Wraps a local filesystem failure
    pub fn io(context: impl std::fmt::Display, err: &anyhow::Error) -> Self {
        SyncError::Io(format!("{context}: {err:#}"))
    }

    /// Wraps a metadata or object store failure
    ///
    /// Transient-looking failures become [`SyncError::Network`], everything
    /// else [`SyncError::Storage`].
    pub fn remote(context: impl std::fmt::Display, err: &anyhow::Error) -> Self {
        let message = format!("{context}: {err:#}");
        if is_transient_error(err) {
            SyncError::Network(message)
        } else {
            SyncError::Storage(message)
        }
    }

    /// Returns true if a later pass may succeed without intervention
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Network(_))
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

/// Determines whether a store error looks transient
///
/// Transient errors include:
/// - Network errors (connection refused, timeout, DNS)
/// - Rate limiting (HTTP 429)
/// - Server errors (HTTP 5xx)
pub fn is_transient_error(err: &anyhow::Error) -> bool {
    let err_str = format!("{err:#}").to_lowercase();

    // Network errors
    if err_str.contains("network")
        || err_str.contains("connection")
        || err_str.contains("timeout")
        || err_str.contains("timed out")
        || err_str.contains("dns")
        || err_str.contains("reset by peer")
        || err_str.contains("broken pipe")
    {
        return true;
    }

    // Rate limiting
    if err_str.contains("429")
        || err_str.contains("too many requests")
        || err_str.contains("rate limit")
    {
        return true;
    }

    // Server errors (5xx)
    err_str.contains("500")
        || err_str.contains("502")
        || err_str.contains("503")
        || err_str.contains("504")
        || err_str.contains("server error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_errors_are_classified() {
        let err = anyhow::anyhow!("connection refused");
        assert!(matches!(SyncError::remote("upload", &err), SyncError::Network(_)));

        let err = anyhow::anyhow!("HTTP 503 Service Unavailable");
        assert!(SyncError::remote("upload", &err).is_transient());

        let err = anyhow::anyhow!("UNIQUE constraint failed");
        assert!(matches!(SyncError::remote("create", &err), SyncError::Storage(_)));
    }

    #[test]
    fn test_context_is_kept_in_message() {
        let err = anyhow::anyhow!("disk quota exceeded");
        let sync_err = SyncError::io("Failed to read /root/A.txt", &err);
        assert_eq!(
            sync_err.to_string(),
            "IO error: Failed to read /root/A.txt: disk quota exceeded"
        );
    }

    #[test]
    fn test_domain_error_converts() {
        let err: SyncError = DomainError::InvalidPath("x".into()).into();
        assert!(matches!(err, SyncError::Domain(_)));
        assert!(!err.is_transient());
    }
}
