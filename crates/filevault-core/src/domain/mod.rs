//! Domain entities
//!
//! This module contains the core domain types for FileVault:
//! - Newtypes for type-safe identifiers and validated paths
//! - Local and remote item snapshots
//! - Diff results and their classification
//! - The persisted sync configuration
//! - Domain-specific error types

pub mod configuration;
pub mod diff;
pub mod errors;
pub mod item;
pub mod newtypes;

// Re-export commonly used types
pub use configuration::SyncConfiguration;
pub use diff::{DiffEntry, DiffResult, DiffSummary, SyncAction, SyncDirection};
pub use errors::DomainError;
pub use item::{ItemKind, LocalItem, NewItem, RemoteItem};
pub use newtypes::*;
