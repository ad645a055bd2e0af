//! In-memory port doubles shared by the integration suites
//!
//! The local side is always a real [`TempDir`] driven through
//! [`LocalFileSystemAdapter`]; the remote side is in memory so tests can
//! inspect every mutation and inject failures.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use filevault_core::domain::{
    ConfigurationId, DiffResult, ItemId, ItemKind, NewItem, RemoteItem, StorageKey,
    SyncConfiguration, SyncPath, SyncType, UserId,
};
use filevault_core::ports::{
    Decision, IConfigurationStore, IDecisionPrompt, ILocalFileSystem, IMetadataStore,
    IObjectStore,
};
use filevault_sync::filesystem::LocalFileSystemAdapter;
use tempfile::TempDir;
use tokio::sync::Notify;

/// Fixed reference time; `at(n)` is `n` seconds after it
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
}

// ============================================================================
// Metadata store
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOp {
    Create { id: ItemId, parent: Option<ItemId>, name: String },
    Delete(ItemId),
}

#[derive(Default)]
pub struct MemoryMetadata {
    items: Mutex<BTreeMap<ItemId, RemoteItem>>,
    ops: Mutex<Vec<MetadataOp>>,
    creates: AtomicUsize,
    fail_create_on: Mutex<Option<(usize, String)>>,
}

impl MemoryMetadata {
    /// Inserts a record without logging it as a mutation
    pub fn seed(&self, item: RemoteItem) -> ItemId {
        let id = item.id.clone();
        self.items.lock().unwrap().insert(id.clone(), item);
        id
    }

    pub fn seed_folder(&self, parent: Option<&ItemId>, name: &str, local: Option<&SyncPath>) -> ItemId {
        self.seed(RemoteItem {
            id: ItemId::generate(),
            parent_id: parent.cloned(),
            kind: ItemKind::Folder,
            name: name.to_string(),
            storage_key: None,
            local_path: local.cloned(),
            size: None,
            last_modified: None,
        })
    }

    pub fn seed_file(
        &self,
        parent: &ItemId,
        name: &str,
        local: &SyncPath,
        modified: DateTime<Utc>,
        key: &StorageKey,
    ) -> ItemId {
        self.seed(RemoteItem {
            id: ItemId::generate(),
            parent_id: Some(parent.clone()),
            kind: ItemKind::File,
            name: name.to_string(),
            storage_key: Some(key.clone()),
            local_path: Some(local.clone()),
            size: None,
            last_modified: Some(modified),
        })
    }

    /// Makes the `n`th create call (1-based) fail with `message`
    pub fn fail_create_on(&self, n: usize, message: &str) {
        *self.fail_create_on.lock().unwrap() = Some((n, message.to_string()));
    }

    pub fn ops(&self) -> Vec<MetadataOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn items(&self) -> Vec<RemoteItem> {
        self.items.lock().unwrap().values().cloned().collect()
    }

    pub fn get(&self, id: &ItemId) -> Option<RemoteItem> {
        self.items.lock().unwrap().get(id).cloned()
    }

    pub fn find_by_local_path(&self, path: &SyncPath) -> Vec<RemoteItem> {
        self.items
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.local_path.as_ref() == Some(path))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl IMetadataStore for MemoryMetadata {
    async fn create_item(&self, item: NewItem) -> anyhow::Result<ItemId> {
        let n = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((fail_on, message)) = self.fail_create_on.lock().unwrap().clone() {
            if n == fail_on {
                anyhow::bail!(message);
            }
        }

        let id = item.id.clone();
        self.ops.lock().unwrap().push(MetadataOp::Create {
            id: id.clone(),
            parent: item.parent_id.clone(),
            name: item.name.clone(),
        });
        self.items.lock().unwrap().insert(id.clone(), item.into_remote());
        Ok(id)
    }

    async fn get_item(&self, id: &ItemId) -> anyhow::Result<Option<RemoteItem>> {
        Ok(self.get(id))
    }

    async fn list_items(&self, parent: &ItemId, recursive: bool) -> anyhow::Result<Vec<RemoteItem>> {
        let items = self.items.lock().unwrap();
        let mut result = Vec::new();
        let mut queue = VecDeque::from([parent.clone()]);
        while let Some(current) = queue.pop_front() {
            for item in items.values().filter(|i| i.parent_id.as_ref() == Some(&current)) {
                if recursive && item.is_folder() {
                    queue.push_back(item.id.clone());
                }
                result.push(item.clone());
            }
        }
        Ok(result)
    }

    async fn delete_item(&self, id: &ItemId) -> anyhow::Result<()> {
        self.ops.lock().unwrap().push(MetadataOp::Delete(id.clone()));
        self.items.lock().unwrap().remove(id);
        Ok(())
    }
}

// ============================================================================
// Object store
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectOp {
    Store(StorageKey),
    Remove(StorageKey),
}

#[derive(Default)]
pub struct MemoryObjects {
    objects: Mutex<HashMap<StorageKey, Vec<u8>>>,
    ops: Mutex<Vec<ObjectOp>>,
    stores: AtomicUsize,
    fail_store_on: Mutex<Option<(usize, String)>>,
}

impl MemoryObjects {
    pub fn seed(&self, key: &str, data: &[u8]) -> StorageKey {
        let key = StorageKey::new(key).unwrap();
        self.objects.lock().unwrap().insert(key.clone(), data.to_vec());
        key
    }

    /// Makes the `n`th store call (1-based) fail with `message`
    pub fn fail_store_on(&self, n: usize, message: &str) {
        *self.fail_store_on.lock().unwrap() = Some((n, message.to_string()));
    }

    pub fn ops(&self) -> Vec<ObjectOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn contains(&self, key: &StorageKey) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn get(&self, key: &StorageKey) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl IObjectStore for MemoryObjects {
    async fn store(
        &self,
        owner: &UserId,
        item_id: &ItemId,
        _name: &str,
        data: Vec<u8>,
    ) -> anyhow::Result<StorageKey> {
        let n = self.stores.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((fail_on, message)) = self.fail_store_on.lock().unwrap().clone() {
            if n == fail_on {
                anyhow::bail!(message);
            }
        }

        let key = StorageKey::new(format!("{owner}/{item_id}"))?;
        self.ops.lock().unwrap().push(ObjectOp::Store(key.clone()));
        self.objects.lock().unwrap().insert(key.clone(), data);
        Ok(key)
    }

    async fn retrieve(&self, key: &StorageKey) -> anyhow::Result<Vec<u8>> {
        self.get(key)
            .ok_or_else(|| anyhow::anyhow!("no object stored under {key}"))
    }

    async fn remove(&self, key: &StorageKey, _name: &str) -> anyhow::Result<()> {
        self.ops.lock().unwrap().push(ObjectOp::Remove(key.clone()));
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

// ============================================================================
// Configuration store
// ============================================================================

#[derive(Default)]
pub struct MemoryConfigurations {
    configs: Mutex<Vec<SyncConfiguration>>,
}

impl MemoryConfigurations {
    pub fn last_synced(&self, id: &ConfigurationId) -> Option<DateTime<Utc>> {
        self.configs
            .lock()
            .unwrap()
            .iter()
            .find(|c| &c.id == id)
            .and_then(|c| c.last_synced_at)
    }
}

#[async_trait::async_trait]
impl IConfigurationStore for MemoryConfigurations {
    async fn get_configuration(
        &self,
        user: &UserId,
        sync_type: &SyncType,
    ) -> anyhow::Result<Option<SyncConfiguration>> {
        Ok(self
            .configs
            .lock()
            .unwrap()
            .iter()
            .find(|c| &c.user_id == user && &c.sync_type == sync_type)
            .cloned())
    }

    async fn save_configuration(&self, config: &SyncConfiguration) -> anyhow::Result<()> {
        let mut configs = self.configs.lock().unwrap();
        configs.retain(|c| c.id != config.id);
        configs.push(config.clone());
        Ok(())
    }

    async fn update_last_synced(&self, id: &ConfigurationId, at: DateTime<Utc>) -> anyhow::Result<()> {
        let mut configs = self.configs.lock().unwrap();
        let config = configs
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| anyhow::anyhow!("unknown configuration {id}"))?;
        config.last_synced_at = Some(at);
        Ok(())
    }
}

// ============================================================================
// Decision prompts
// ============================================================================

/// Answers with queued decisions, then `Dismissed`
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<Decision>>,
    calls: AtomicUsize,
}

impl ScriptedPrompt {
    pub fn answering(answers: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IDecisionPrompt for ScriptedPrompt {
    async fn decide(&self, _diff: &DiffResult) -> anyhow::Result<Decision> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Decision::Dismissed))
    }
}

/// Blocks inside `decide` until released, then dismisses
#[derive(Default)]
pub struct GatedPrompt {
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait::async_trait]
impl IDecisionPrompt for GatedPrompt {
    async fn decide(&self, _diff: &DiffResult) -> anyhow::Result<Decision> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Decision::Dismissed)
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub dir: TempDir,
    pub base: SyncPath,
    pub owner: UserId,
    pub root_id: ItemId,
    pub fs: Arc<LocalFileSystemAdapter>,
    pub metadata: Arc<MemoryMetadata>,
    pub objects: Arc<MemoryObjects>,
    pub configurations: Arc<MemoryConfigurations>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let base = SyncPath::new(dir.path().to_path_buf()).unwrap();
        let owner = UserId::new("alice").unwrap();
        let metadata = Arc::new(MemoryMetadata::default());
        let root_id = metadata.seed_folder(None, "root", None);
        Self {
            dir,
            base,
            owner,
            root_id,
            fs: Arc::new(LocalFileSystemAdapter::new()),
            metadata,
            objects: Arc::new(MemoryObjects::default()),
            configurations: Arc::new(MemoryConfigurations::default()),
        }
    }

    pub fn path(&self, relative: &str) -> SyncPath {
        self.base.join(relative).unwrap()
    }

    pub async fn write_local(&self, relative: &str, data: &[u8], modified: DateTime<Utc>) {
        let path = self.path(relative);
        self.fs.write_file(&path, data).await.unwrap();
        self.fs.set_modified(&path, modified).await.unwrap();
    }

    pub async fn mkdir_local(&self, relative: &str) {
        self.fs.create_directory(&self.path(relative)).await.unwrap();
    }

    pub fn read_local(&self, relative: &str) -> Option<Vec<u8>> {
        std::fs::read(self.path(relative).as_path()).ok()
    }

    /// Seeds a remote file under `parent` whose payload is `data`
    pub fn seed_remote_file(
        &self,
        parent: &ItemId,
        relative: &str,
        data: &[u8],
        modified: DateTime<Utc>,
    ) -> (ItemId, StorageKey) {
        let path = self.path(relative);
        let name = path.file_name().unwrap();
        let key = self.objects.seed(&format!("seed/{relative}"), data);
        let id = self.metadata.seed_file(parent, &name, &path, modified, &key);
        (id, key)
    }

    pub fn seed_remote_folder(&self, parent: &ItemId, relative: &str) -> ItemId {
        let path = self.path(relative);
        let name = path.file_name().unwrap();
        self.metadata.seed_folder(Some(parent), &name, Some(&path))
    }

    pub fn configuration(&self) -> SyncConfiguration {
        SyncConfiguration::new(
            self.owner.clone(),
            SyncType::default(),
            self.base.clone(),
            self.root_id.clone(),
        )
    }

    pub fn fs_port(&self) -> Arc<dyn ILocalFileSystem + Send + Sync> {
        self.fs.clone()
    }

    pub fn metadata_port(&self) -> Arc<dyn IMetadataStore + Send + Sync> {
        self.metadata.clone()
    }

    pub fn objects_port(&self) -> Arc<dyn IObjectStore + Send + Sync> {
        self.objects.clone()
    }
}
