//! Watch command - Poll for drift until interrupted

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use filevault_sync::progress::ProgressReporter;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{AppContext, NOT_INITIALIZED};
use crate::output::{Output, OutputFormat};
use crate::prompt::TerminalPrompt;

#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Seconds between checks (defaults to sync.poll_interval)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,
}

impl WatchCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let out = Output::new(format);

        let stores = ctx.open_stores().await?;
        let Some(sync_config) = ctx.load_configuration(&stores).await? else {
            out.error(NOT_INITIALIZED);
            return Ok(());
        };

        // One token stops both the loop and any pass in flight
        let shutdown = CancellationToken::new();
        let mut orchestrator = ctx.orchestrator(
            sync_config,
            &stores,
            Arc::new(TerminalPrompt),
            ProgressReporter::silent(shutdown.clone()),
        );
        if let Some(secs) = self.interval {
            orchestrator = orchestrator.with_poll_interval(Duration::from_secs(secs));
        }

        {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received, shutting down");
                    shutdown.cancel();
                }
            });
        }

        out.success(&format!(
            "Watching {} (Ctrl-C to stop)",
            orchestrator.configuration().local_path
        ));
        orchestrator.run(shutdown).await;
        out.success("Stopped");
        Ok(())
    }
}
