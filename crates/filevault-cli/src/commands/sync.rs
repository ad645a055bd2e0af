//! Sync command - Run one sync pass
//!
//! Without `--direction` the diff is shown and the user picks which side
//! wins. With it the pass runs unattended. Ctrl-C cancels the pass at the
//! next transfer boundary and rolls back what it created remotely.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use filevault_core::domain::SyncDirection;
use filevault_core::ports::IDecisionPrompt;
use filevault_sync::orchestrator::TickOutcome;
use filevault_sync::progress::ProgressReporter;
use filevault_sync::SyncError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{AppContext, NOT_INITIALIZED};
use crate::output::{plural, Output, OutputFormat};
use crate::prompt::{DismissPrompt, TerminalPrompt};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Apply without asking: push (local wins) or pull (remote wins)
    #[arg(long, value_name = "DIRECTION")]
    pub direction: Option<SyncDirection>,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let out = Output::new(format);

        let stores = ctx.open_stores().await?;
        let Some(sync_config) = ctx.load_configuration(&stores).await? else {
            out.error(NOT_INITIALIZED);
            return Ok(());
        };

        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(64);
        let progress = ProgressReporter::new(tx, cancel.clone());

        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling after the current transfer");
                    cancel.cancel();
                }
            })
        };
        let show_progress = !out.is_json();
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if show_progress {
                    println!("  [{}/{}] {}", event.processed, event.total, event.current_file);
                }
            }
        });

        // JSON output is for scripts, so never block on the terminal there
        let prompt: Arc<dyn IDecisionPrompt + Send + Sync> = if out.is_json() {
            Arc::new(DismissPrompt)
        } else {
            Arc::new(TerminalPrompt)
        };
        let orchestrator = ctx.orchestrator(sync_config, &stores, prompt, progress);

        let result = match self.direction {
            Some(direction) => {
                info!(%direction, "Running sync pass");
                orchestrator.sync_now(direction).await
            }
            None => orchestrator.tick().await,
        };

        drop(orchestrator);
        interrupt.abort();
        let _ = printer.await;

        match result {
            Ok(outcome) => print_outcome(&out, &outcome),
            Err(SyncError::Cancelled) => {
                out.warn("Sync cancelled; remote changes from this pass were rolled back");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Sync pass failed")),
        }
    }
}

fn print_outcome(out: &Output, outcome: &TickOutcome) -> Result<()> {
    if out.is_json() {
        return out.json(outcome);
    }

    match outcome {
        TickOutcome::Skipped => out.warn("Another pass is still running"),
        TickOutcome::InSync => out.success("Already up to date"),
        TickOutcome::Dismissed { summary } => {
            out.line(&format!(
                "Skipped; {} still pending",
                plural(summary.total(), "change")
            ));
        }
        TickOutcome::Synced { direction, report } => {
            let label = match direction {
                SyncDirection::LocalToRemote => "Pushed local changes",
                SyncDirection::RemoteToLocal => "Pulled remote changes",
            };
            out.success(label);
            let counts = [
                ("Uploaded", report.uploaded, "file"),
                ("Downloaded", report.downloaded, "file"),
                ("Created", report.created_directories, "directory"),
                ("Deleted remotely", report.deleted_remote, "item"),
                ("Deleted locally", report.deleted_local, "item"),
                ("Unchanged", report.skipped, "item"),
            ];
            let rows: Vec<(&str, String)> = counts
                .into_iter()
                .filter(|(_, count, _)| *count > 0)
                .map(|(label, count, noun)| (label, plural(count, noun)))
                .collect();
            out.fields(&rows);
        }
    }
    Ok(())
}
