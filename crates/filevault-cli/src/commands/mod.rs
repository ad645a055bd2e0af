//! Subcommands and the adapter wiring they share

pub mod config;
pub mod init;
pub mod status;
pub mod sync;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use filevault_core::config::Config;
use filevault_core::domain::{DiffEntry, DiffResult, SyncConfiguration};
use filevault_core::ports::{IConfigurationStore, IDecisionPrompt};
use filevault_store::{DatabasePool, FsObjectStore, SqliteConfigurationStore, SqliteMetadataStore};
use filevault_sync::filesystem::LocalFileSystemAdapter;
use filevault_sync::orchestrator::{SyncOrchestrator, SyncPorts};
use filevault_sync::progress::ProgressReporter;
use tracing::info;

/// Loaded configuration plus where it came from
pub struct AppContext {
    pub config_path: PathBuf,
    pub config: Config,
}

/// Open adapters for one invocation
pub struct Stores {
    // Keeps the connections alive for the lifetime of the ports
    _pool: DatabasePool,
    pub ports: SyncPorts,
}

impl AppContext {
    pub fn new(config_path: PathBuf, config: Config) -> Self {
        Self {
            config_path,
            config,
        }
    }

    /// Opens the SQLite database and object directory named by the config
    pub async fn open_stores(&self) -> Result<Stores> {
        let storage = &self.config.storage;
        let pool = DatabasePool::open(&storage.database)
            .await
            .context("Failed to open database")?;
        info!(
            database = %storage.database.display(),
            objects = %storage.objects_dir.display(),
            "Opened stores"
        );

        let ports = SyncPorts {
            filesystem: Arc::new(LocalFileSystemAdapter::new()),
            metadata: Arc::new(SqliteMetadataStore::new(pool.pool().clone())),
            objects: Arc::new(FsObjectStore::new(storage.objects_dir.clone())),
            configurations: Arc::new(SqliteConfigurationStore::new(pool.pool().clone())),
        };
        Ok(Stores { _pool: pool, ports })
    }

    /// The persisted sync configuration for the configured user and type
    pub async fn load_configuration(&self, stores: &Stores) -> Result<Option<SyncConfiguration>> {
        let user = self.config.user_id().context("Invalid sync.user")?;
        let sync_type = self.config.sync_type().context("Invalid sync.sync_type")?;
        stores
            .ports
            .configurations
            .get_configuration(&user, &sync_type)
            .await
            .context("Failed to load sync configuration")
    }

    pub fn orchestrator(
        &self,
        sync_config: SyncConfiguration,
        stores: &Stores,
        prompt: Arc<dyn IDecisionPrompt + Send + Sync>,
        progress: ProgressReporter,
    ) -> SyncOrchestrator {
        SyncOrchestrator::new(
            sync_config,
            stores.ports.clone(),
            prompt,
            &self.config.scan,
            progress,
        )
        .with_poll_interval(Duration::from_secs(self.config.sync.poll_interval))
    }
}

pub const NOT_INITIALIZED: &str = "No sync configuration found. Run 'filevault init' first.";

/// `+ path`, `~ path`, `- path` lines for a diff
pub fn diff_lines(diff: &DiffResult) -> Vec<String> {
    diff.entries
        .iter()
        .map(|entry| match entry {
            DiffEntry::LocalOnly { local } => format!("+ {}", display_local(&local.path, local.is_folder())),
            DiffEntry::Modified { local, .. } => format!("~ {}", local.path),
            DiffEntry::RemoteOnly { remote } => {
                let shown = remote
                    .local_path
                    .as_ref()
                    .and_then(|p| p.relative_to(&diff.base).ok())
                    .unwrap_or_else(|| remote.name.clone());
                format!("- {}", display_local(&shown, remote.is_folder()))
            }
        })
        .collect()
}

fn display_local(path: &str, is_folder: bool) -> String {
    if is_folder {
        format!("{}/", path)
    } else {
        path.to_string()
    }
}
