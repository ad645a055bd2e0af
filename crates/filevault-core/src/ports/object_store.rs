//! Object store port (driven/secondary port)
//!
//! Opaque payload storage for file contents. Payloads are addressed by the
//! [`StorageKey`] returned from [`IObjectStore::store`], which the metadata
//! record of the file keeps.

use crate::domain::newtypes::{ItemId, StorageKey, UserId};

/// Port trait for file payload storage
#[async_trait::async_trait]
pub trait IObjectStore: Send + Sync {
    /// Stores a payload for `item_id` owned by `owner`
    ///
    /// # Returns
    /// The key under which the payload can be retrieved
    async fn store(
        &self,
        owner: &UserId,
        item_id: &ItemId,
        name: &str,
        data: Vec<u8>,
    ) -> anyhow::Result<StorageKey>;

    /// Retrieves a payload
    ///
    /// # Errors
    /// Returns an error if no payload exists under `key`
    async fn retrieve(&self, key: &StorageKey) -> anyhow::Result<Vec<u8>>;

    /// Removes a payload
    ///
    /// Removing a payload that does not exist is not an error.
    async fn remove(&self, key: &StorageKey, name: &str) -> anyhow::Result<()>;
}
