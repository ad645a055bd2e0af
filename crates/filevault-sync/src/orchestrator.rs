//! Polling sync orchestrator
//!
//! One [`SyncOrchestrator`] drives one [`SyncConfiguration`]. Each tick scans
//! the local root, fetches the remote tree, diffs the two and, when they
//! differ, asks an [`IDecisionPrompt`] which side wins.
//!
//! ## States
//!
//! ```text
//!   Idle ──tick──→ Checking ──in sync──→ Idle
//!                     │
//!                     └─drift─→ AwaitingDecision ──dismissed──→ Idle (diff still pending)
//!                                      │
//!                                      └─apply─→ Syncing ──→ Idle
//! ```
//!
//! A tick that arrives while another tick is checking, waiting for a decision
//! or syncing is dropped, not queued. A dismissed or failed pass leaves the
//! pending flag set and `last_synced_at` untouched; the next tick recomputes
//! the diff and surfaces it again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use filevault_core::config::ScanConfig;
use filevault_core::domain::{
    DiffResult, DiffSummary, LocalItem, SyncConfiguration, SyncDirection,
};
use filevault_core::ports::{
    Decision, IConfigurationStore, IDecisionPrompt, ILocalFileSystem, IMetadataStore,
    IObjectStore,
};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::diff::DiffEngine;
use crate::executor::{ExecutionReport, SyncExecutor};
use crate::folder_mapper::FolderMapper;
use crate::progress::ProgressReporter;
use crate::remote_tree::RemoteTree;
use crate::scanner::LocalScanner;
use crate::undo::UndoLog;
use crate::SyncError;

/// Default seconds between ticks in [`SyncOrchestrator::run`]
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    Checking,
    AwaitingDecision,
    Syncing,
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Another tick was still in flight
    Skipped,
    /// Both sides already match
    InSync,
    /// Drift was found and the decision was deferred
    Dismissed { summary: DiffSummary },
    /// Drift was found and resolved in `direction`
    Synced {
        direction: SyncDirection,
        report: ExecutionReport,
    },
}

/// Adapters an orchestrator drives
#[derive(Clone)]
pub struct SyncPorts {
    pub filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
    pub metadata: Arc<dyn IMetadataStore + Send + Sync>,
    pub objects: Arc<dyn IObjectStore + Send + Sync>,
    pub configurations: Arc<dyn IConfigurationStore + Send + Sync>,
}

pub struct SyncOrchestrator {
    config: SyncConfiguration,
    scanner: LocalScanner,
    remote_tree: RemoteTree,
    mapper: FolderMapper,
    executor: SyncExecutor,
    configurations: Arc<dyn IConfigurationStore + Send + Sync>,
    prompt: Arc<dyn IDecisionPrompt + Send + Sync>,
    progress: ProgressReporter,
    poll_interval: Duration,
    state: Mutex<OrchestratorState>,
    busy: AtomicBool,
    pending_diff: AtomicBool,
    last_synced_at: Mutex<Option<DateTime<Utc>>>,
}

/// Holds the busy flag for the duration of one tick
struct TickGuard<'a> {
    orchestrator: &'a SyncOrchestrator,
}

impl<'a> TickGuard<'a> {
    fn acquire(orchestrator: &'a SyncOrchestrator) -> Option<Self> {
        orchestrator
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { orchestrator })
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.set_state(OrchestratorState::Idle);
        self.orchestrator.busy.store(false, Ordering::Release);
    }
}

impl SyncOrchestrator {
    pub fn new(
        config: SyncConfiguration,
        ports: SyncPorts,
        prompt: Arc<dyn IDecisionPrompt + Send + Sync>,
        scan: &ScanConfig,
        progress: ProgressReporter,
    ) -> Self {
        let owner = config.user_id.clone();
        let last_synced_at = config.last_synced_at;
        Self {
            scanner: LocalScanner::with_config(ports.filesystem.clone(), scan),
            remote_tree: RemoteTree::new(ports.metadata.clone()),
            mapper: FolderMapper::new(ports.metadata.clone(), owner.clone()),
            executor: SyncExecutor::new(
                ports.filesystem,
                ports.metadata,
                ports.objects,
                owner,
            ),
            configurations: ports.configurations,
            prompt,
            progress,
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: Mutex::new(OrchestratorState::Idle),
            busy: AtomicBool::new(false),
            pending_diff: AtomicBool::new(false),
            last_synced_at: Mutex::new(last_synced_at),
            config,
        }
    }

    /// Sets the period of [`SyncOrchestrator::run`]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn configuration(&self) -> &SyncConfiguration {
        &self.config
    }

    pub fn state(&self) -> OrchestratorState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// True while an unresolved diff is waiting to be surfaced again
    pub fn has_pending_diff(&self) -> bool {
        self.pending_diff.load(Ordering::Acquire)
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        *self.last_synced_at.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: OrchestratorState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Scan and diff without executing anything
    pub async fn check(&self) -> Result<DiffResult, SyncError> {
        let (_, diff) = self.snapshot().await?;
        Ok(diff)
    }

    async fn snapshot(&self) -> Result<(Vec<LocalItem>, DiffResult), SyncError> {
        let base = &self.config.local_path;
        let local_items = self.scanner.scan(base).await?;
        let remote_items = self
            .remote_tree
            .fetch(&self.config.remote_folder_id, true)
            .await?;
        let diff = DiffEngine::compare(base, &local_items, &remote_items)?;
        Ok((local_items, diff))
    }

    /// One polling step
    ///
    /// Returns [`TickOutcome::Skipped`] without doing anything if another
    /// tick is still in flight.
    #[instrument(skip(self), fields(config = %self.config.id))]
    pub async fn tick(&self) -> Result<TickOutcome, SyncError> {
        let Some(_guard) = TickGuard::acquire(self) else {
            debug!("tick skipped, previous tick still in flight");
            return Ok(TickOutcome::Skipped);
        };

        self.set_state(OrchestratorState::Checking);
        let (local_items, diff) = self.snapshot().await?;
        if diff.is_empty() {
            self.pending_diff.store(false, Ordering::Release);
            debug!("local and remote trees match");
            return Ok(TickOutcome::InSync);
        }

        self.pending_diff.store(true, Ordering::Release);
        self.set_state(OrchestratorState::AwaitingDecision);
        let summary = diff.summary();
        info!(
            action = %diff.action(),
            added = summary.added,
            modified = summary.modified,
            removed = summary.removed,
            "Drift detected, awaiting decision"
        );

        let decision = match self.prompt.decide(&diff).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "Decision prompt failed, treating as dismissed");
                Decision::Dismissed
            }
        };

        match decision {
            Decision::Dismissed => {
                info!("Decision deferred");
                Ok(TickOutcome::Dismissed { summary })
            }
            Decision::Apply(direction) => self.apply(direction, &local_items, &diff).await,
        }
    }

    /// Scan, diff and apply `direction` without asking
    #[instrument(skip(self), fields(config = %self.config.id))]
    pub async fn sync_now(&self, direction: SyncDirection) -> Result<TickOutcome, SyncError> {
        let Some(_guard) = TickGuard::acquire(self) else {
            return Ok(TickOutcome::Skipped);
        };

        self.set_state(OrchestratorState::Checking);
        let (local_items, diff) = self.snapshot().await?;
        if diff.is_empty() {
            self.pending_diff.store(false, Ordering::Release);
            return Ok(TickOutcome::InSync);
        }

        self.pending_diff.store(true, Ordering::Release);
        self.apply(direction, &local_items, &diff).await
    }

    async fn apply(
        &self,
        direction: SyncDirection,
        local_items: &[LocalItem],
        diff: &DiffResult,
    ) -> Result<TickOutcome, SyncError> {
        self.set_state(OrchestratorState::Syncing);
        self.progress.check_cancelled()?;
        info!(%direction, "Sync pass starting");

        let report = match direction {
            SyncDirection::LocalToRemote => {
                let mut undo = UndoLog::new();
                let mapping = match self
                    .mapper
                    .build(
                        local_items,
                        &self.config.local_path,
                        &self.config.remote_folder_id,
                        &mut undo,
                    )
                    .await
                {
                    Ok(mapping) => mapping,
                    Err(e) => {
                        undo.rollback().await;
                        return Err(e);
                    }
                };
                self.executor
                    .execute_local_to_remote(diff, &mapping, &mut undo, &self.progress)
                    .await?
            }
            SyncDirection::RemoteToLocal => {
                self.executor
                    .execute_remote_to_local(diff, &self.config.local_path, &self.progress)
                    .await?
            }
        };

        let now = Utc::now();
        self.configurations
            .update_last_synced(&self.config.id, now)
            .await
            .map_err(|e| SyncError::remote("Failed to record sync completion", &e))?;
        *self.last_synced_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(now);
        self.pending_diff.store(false, Ordering::Release);

        info!(%direction, changes = report.changes(), "Sync pass complete");
        Ok(TickOutcome::Synced { direction, report })
    }

    /// Tick every poll interval until `shutdown` is cancelled
    ///
    /// Missed ticks are skipped. A pass in flight is not interrupted by
    /// `shutdown`; it stops at the next transfer boundary only if the
    /// progress reporter shares the token.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            local = %self.config.local_path,
            "Sync orchestrator starting"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.tick().await {
                Ok(outcome) => debug!(?outcome, "tick finished"),
                Err(SyncError::Cancelled) => {
                    info!("Sync pass cancelled");
                    break;
                }
                Err(e) => error!(error = %e, "Sync pass failed"),
            }
        }

        info!("Sync orchestrator stopped");
    }
}
