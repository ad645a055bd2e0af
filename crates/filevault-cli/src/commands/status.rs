//! Status command - Show drift between the local and remote trees
//!
//! Scans and diffs without transferring anything.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;

use super::{diff_lines, AppContext, NOT_INITIALIZED};
use crate::output::{plural, Output, OutputFormat};
use crate::prompt::DismissPrompt;
use filevault_sync::progress::ProgressReporter;

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Only print the counts
    #[arg(long)]
    pub summary: bool,
}

impl StatusCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let out = Output::new(format);

        let stores = ctx.open_stores().await?;
        let Some(sync_config) = ctx.load_configuration(&stores).await? else {
            out.error(NOT_INITIALIZED);
            return Ok(());
        };

        let orchestrator = ctx.orchestrator(
            sync_config.clone(),
            &stores,
            Arc::new(DismissPrompt),
            ProgressReporter::silent(CancellationToken::new()),
        );
        let diff = orchestrator.check().await.context("Failed to compare trees")?;
        let summary = diff.summary();

        if out.is_json() {
            let mut json = serde_json::json!({
                "local_path": sync_config.local_path.to_string(),
                "remote_folder_id": sync_config.remote_folder_id.as_str(),
                "last_synced_at": sync_config.last_synced_at.map(|t| t.to_rfc3339()),
                "action": diff.action(),
                "summary": summary,
            });
            if !self.summary {
                json["entries"] =
                    serde_json::to_value(&diff.entries).context("Failed to serialize diff")?;
            }
            return out.json(&json);
        }

        out.fields(&[
            ("Local", sync_config.local_path.to_string()),
            ("Remote root", sync_config.remote_folder_id.to_string()),
            (
                "Last synced",
                sync_config
                    .last_synced_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "never".to_string()),
            ),
        ]);

        if diff.is_empty() {
            out.success("In sync");
            return Ok(());
        }

        out.warn(&format!(
            "Drift detected ({}): {} added, {} modified, {} removed",
            diff.action(),
            summary.added,
            summary.modified,
            summary.removed
        ));
        if !self.summary {
            for line in diff_lines(&diff) {
                out.line(&line);
            }
        }
        out.line(&format!(
            "{} pending. Run 'filevault sync' to resolve.",
            plural(summary.total(), "change")
        ));
        Ok(())
    }
}
