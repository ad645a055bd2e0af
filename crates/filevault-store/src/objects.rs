//! Filesystem-backed object store
//!
//! Payloads live under a root directory at a path derived from the SHA-256
//! of their storage key, fanned out by the first two hex digits:
//!
//! ```text
//! objects/
//! └── 3f/
//!     └── 3fa4...e1
//! ```
//!
//! Storage keys have the form `{owner}/{item_id}`, so every upload gets a
//! fresh key and payloads are never overwritten in place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use filevault_core::domain::{ItemId, StorageKey, UserId};
use filevault_core::ports::IObjectStore;

const TEMP_SUFFIX: &str = ".partial";

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the payload for `key` lives on disk
    pub fn object_path(&self, key: &StorageKey) -> PathBuf {
        let digest = format!("{:x}", Sha256::digest(key.as_str().as_bytes()));
        self.root.join(&digest[..2]).join(digest)
    }
}

#[async_trait::async_trait]
impl IObjectStore for FsObjectStore {
    #[instrument(skip(self, data), fields(owner = %owner, item = %item_id, bytes = data.len()))]
    async fn store(
        &self,
        owner: &UserId,
        item_id: &ItemId,
        name: &str,
        data: Vec<u8>,
    ) -> anyhow::Result<StorageKey> {
        let key = StorageKey::new(format!("{}/{}", owner, item_id))?;
        let target = self.object_path(&key);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut temp = target.clone().into_os_string();
        temp.push(TEMP_SUFFIX);
        let temp = PathBuf::from(temp);

        tokio::fs::write(&temp, &data)
            .await
            .with_context(|| format!("Failed to write payload for {}", name))?;
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e).with_context(|| format!("Failed to commit payload for {}", name));
        }

        debug!(key = %key, "payload stored");
        Ok(key)
    }

    async fn retrieve(&self, key: &StorageKey) -> anyhow::Result<Vec<u8>> {
        let path = self.object_path(key);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("No payload for {}", key))
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn remove(&self, key: &StorageKey, name: &str) -> anyhow::Result<()> {
        match tokio::fs::remove_file(self.object_path(key)).await {
            Ok(()) => {
                debug!(name, "payload removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove payload for {}", name)),
        }
    }
}
