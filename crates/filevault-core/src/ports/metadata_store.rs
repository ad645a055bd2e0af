//! Metadata store port (driven/secondary port)
//!
//! This module defines the interface to the remote hierarchical item store:
//! folder and file records addressed by opaque [`ItemId`]s, each optionally
//! carrying the local path it was created from.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because backend errors are adapter-specific.
//!   The sync engine classifies them into network vs storage failures.
//! - `delete_item` removes exactly one record. Callers that remove a folder
//!   delete its descendants first.

use crate::domain::item::{NewItem, RemoteItem};
use crate::domain::newtypes::ItemId;

/// Port trait for the remote metadata store
#[async_trait::async_trait]
pub trait IMetadataStore: Send + Sync {
    /// Creates a record and returns its id
    ///
    /// The id is the one carried by `item`; stores that allocate their own
    /// ids may return a different one.
    async fn create_item(&self, item: NewItem) -> anyhow::Result<ItemId>;

    /// Fetches a single record
    ///
    /// Returns `None` if no record has this id.
    async fn get_item(&self, id: &ItemId) -> anyhow::Result<Option<RemoteItem>>;

    /// Lists the records below `parent`, excluding `parent` itself
    ///
    /// # Arguments
    /// * `parent` - Folder to list
    /// * `recursive` - Whether to descend into subfolders
    async fn list_items(&self, parent: &ItemId, recursive: bool)
        -> anyhow::Result<Vec<RemoteItem>>;

    /// Deletes a single record
    ///
    /// Deleting a record that does not exist is not an error.
    async fn delete_item(&self, id: &ItemId) -> anyhow::Result<()>;
}
