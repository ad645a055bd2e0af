//! Init command - Bind a local directory to a remote folder
//!
//! Creates the sync configuration for the configured user and sync type.
//! Running it again returns the existing configuration unchanged.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use filevault_core::domain::{ItemId, SyncPath};
use filevault_core::usecases::InitializeSyncUseCase;
use tracing::info;

use super::AppContext;
use crate::output::{Output, OutputFormat};

#[derive(Debug, Args)]
pub struct InitCommand {
    /// Local directory to sync (defaults to sync.root)
    pub path: Option<PathBuf>,

    /// Existing remote folder to mirror into instead of creating one
    #[arg(long, value_name = "ID")]
    pub remote_folder: Option<ItemId>,
}

impl InitCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let out = Output::new(format);

        let requested = self
            .path
            .clone()
            .unwrap_or_else(|| ctx.config.sync.root.clone());
        tokio::fs::create_dir_all(&requested)
            .await
            .with_context(|| format!("Failed to create {}", requested.display()))?;
        let local_path = SyncPath::new(
            tokio::fs::canonicalize(&requested)
                .await
                .with_context(|| format!("Failed to resolve {}", requested.display()))?,
        )?;

        let user = ctx.config.user_id().context("Invalid sync.user")?;
        let sync_type = ctx.config.sync_type().context("Invalid sync.sync_type")?;
        info!(local = %local_path, user = %user, "Initializing sync configuration");

        let stores = ctx.open_stores().await?;
        let use_case = InitializeSyncUseCase::new(
            stores.ports.metadata.clone(),
            stores.ports.configurations.clone(),
        );
        let config = use_case
            .execute(&user, &sync_type, &local_path, self.remote_folder.clone())
            .await?;

        if out.is_json() {
            return out.json(&config);
        }
        out.success(&format!("Syncing {}", config.local_path));
        out.fields(&[
            ("Configuration", config.id.to_string()),
            ("Remote folder", config.remote_folder_id.to_string()),
            ("User", format!("{} ({})", config.user_id, config.sync_type)),
        ]);
        Ok(())
    }
}
