mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{at, GatedPrompt, Harness, ScriptedPrompt};
use filevault_core::config::ScanConfig;
use filevault_core::domain::{SyncConfiguration, SyncDirection};
use filevault_core::ports::{Decision, IConfigurationStore, IDecisionPrompt};
use filevault_sync::orchestrator::{OrchestratorState, SyncOrchestrator, SyncPorts, TickOutcome};
use filevault_sync::progress::ProgressReporter;
use filevault_sync::SyncError;
use tokio_util::sync::CancellationToken;

async fn orchestrator(
    h: &Harness,
    prompt: Arc<dyn IDecisionPrompt + Send + Sync>,
) -> (SyncOrchestrator, SyncConfiguration) {
    let config = h.configuration();
    h.configurations.save_configuration(&config).await.unwrap();
    let ports = SyncPorts {
        filesystem: h.fs_port(),
        metadata: h.metadata_port(),
        objects: h.objects_port(),
        configurations: h.configurations.clone(),
    };
    let scan = ScanConfig {
        follow_links: false,
        ignore: vec!["*.swp".to_string()],
    };
    let orchestrator = SyncOrchestrator::new(
        config.clone(),
        ports,
        prompt,
        &scan,
        ProgressReporter::silent(CancellationToken::new()),
    );
    (orchestrator, config)
}

#[tokio::test]
async fn test_tick_in_sync_does_not_prompt() {
    let h = Harness::new();
    h.write_local("ignored.swp", b"scratch", at(1)).await;
    let prompt = Arc::new(ScriptedPrompt::default());
    let (orchestrator, config) = orchestrator(&h, prompt.clone()).await;

    let outcome = orchestrator.tick().await.unwrap();

    assert_eq!(outcome, TickOutcome::InSync);
    assert_eq!(prompt.calls(), 0);
    assert!(!orchestrator.has_pending_diff());
    assert!(h.configurations.last_synced(&config.id).is_none());
}

#[tokio::test]
async fn test_dismissed_diff_is_surfaced_again() {
    let h = Harness::new();
    h.write_local("A.txt", b"a", at(1)).await;
    let prompt = Arc::new(ScriptedPrompt::default());
    let (orchestrator, config) = orchestrator(&h, prompt.clone()).await;

    let first = orchestrator.tick().await.unwrap();
    assert!(matches!(first, TickOutcome::Dismissed { summary } if summary.added == 1));
    assert!(orchestrator.has_pending_diff());
    assert_eq!(orchestrator.state(), OrchestratorState::Idle);

    let second = orchestrator.tick().await.unwrap();
    assert!(matches!(second, TickOutcome::Dismissed { .. }));
    assert_eq!(prompt.calls(), 2);
    assert!(h.configurations.last_synced(&config.id).is_none());
    assert!(h.metadata.ops().is_empty());
}

#[tokio::test]
async fn test_applied_decision_syncs_and_records_time() {
    let h = Harness::new();
    h.write_local("B/x.txt", b"x", at(1)).await;
    let prompt = Arc::new(ScriptedPrompt::answering([Decision::Apply(
        SyncDirection::LocalToRemote,
    )]));
    let (orchestrator, config) = orchestrator(&h, prompt.clone()).await;

    let outcome = orchestrator.tick().await.unwrap();
    let TickOutcome::Synced { direction, report } = outcome else {
        panic!("expected a sync, got {outcome:?}");
    };
    assert_eq!(direction, SyncDirection::LocalToRemote);
    assert_eq!(report.uploaded, 1);
    assert!(!orchestrator.has_pending_diff());
    assert!(orchestrator.last_synced_at().is_some());
    assert_eq!(
        h.configurations.last_synced(&config.id),
        orchestrator.last_synced_at()
    );

    // Next tick finds nothing to do and does not prompt
    assert_eq!(orchestrator.tick().await.unwrap(), TickOutcome::InSync);
    assert_eq!(prompt.calls(), 1);
}

#[tokio::test]
async fn test_failed_pass_keeps_diff_pending() {
    let h = Harness::new();
    h.write_local("A.txt", b"a", at(1)).await;
    h.objects.fail_store_on(1, "quota exceeded");
    let prompt = Arc::new(ScriptedPrompt::answering([Decision::Apply(
        SyncDirection::LocalToRemote,
    )]));
    let (orchestrator, config) = orchestrator(&h, prompt).await;

    let err = orchestrator.tick().await.unwrap_err();

    assert!(matches!(err, SyncError::Storage(_)));
    assert!(orchestrator.has_pending_diff());
    assert!(orchestrator.last_synced_at().is_none());
    assert!(h.configurations.last_synced(&config.id).is_none());
    assert_eq!(orchestrator.state(), OrchestratorState::Idle);
}

#[tokio::test]
async fn test_tick_skipped_while_decision_pending() {
    let h = Harness::new();
    h.write_local("A.txt", b"a", at(1)).await;
    let prompt = Arc::new(GatedPrompt::default());
    let (orchestrator, _) = orchestrator(&h, prompt.clone()).await;
    let orchestrator = Arc::new(orchestrator);

    let background = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.tick().await })
    };
    prompt.entered.notified().await;

    assert_eq!(orchestrator.state(), OrchestratorState::AwaitingDecision);
    assert_eq!(orchestrator.tick().await.unwrap(), TickOutcome::Skipped);
    assert_eq!(
        orchestrator.sync_now(SyncDirection::RemoteToLocal).await.unwrap(),
        TickOutcome::Skipped
    );

    prompt.release.notify_one();
    let outcome = background.await.unwrap().unwrap();
    assert!(matches!(outcome, TickOutcome::Dismissed { .. }));
    assert_eq!(orchestrator.state(), OrchestratorState::Idle);
}

#[tokio::test]
async fn test_sync_now_pulls_without_prompt() {
    let h = Harness::new();
    h.seed_remote_file(&h.root_id, "D.txt", b"dee", at(3));
    let prompt = Arc::new(ScriptedPrompt::default());
    let (orchestrator, _) = orchestrator(&h, prompt.clone()).await;

    let outcome = orchestrator
        .sync_now(SyncDirection::RemoteToLocal)
        .await
        .unwrap();

    assert!(matches!(outcome, TickOutcome::Synced { report, .. } if report.downloaded == 1));
    assert_eq!(prompt.calls(), 0);
    assert_eq!(h.read_local("D.txt").unwrap(), b"dee");
    assert!(orchestrator.check().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scan_failure_is_io_error() {
    let h = Harness::new();
    let prompt = Arc::new(ScriptedPrompt::default());
    let (orchestrator, _) = orchestrator(&h, prompt).await;
    std::fs::remove_dir_all(h.dir.path()).unwrap();

    let err = orchestrator.tick().await.unwrap_err();
    assert!(matches!(err, SyncError::Io(_)));
    assert_eq!(orchestrator.state(), OrchestratorState::Idle);
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let h = Harness::new();
    h.write_local("A.txt", b"a", at(1)).await;
    let prompt = Arc::new(ScriptedPrompt::default());
    let (orchestrator, _) = orchestrator(&h, prompt.clone()).await;
    let orchestrator = Arc::new(orchestrator.with_poll_interval(Duration::from_millis(10)));
    let shutdown = CancellationToken::new();

    let handle = {
        let orchestrator = orchestrator.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { orchestrator.run(shutdown).await })
    };
    tokio::time::sleep(Duration::from_millis(60)).await;
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("orchestrator did not stop")
        .unwrap();
    assert!(prompt.calls() >= 1);
    assert!(orchestrator.has_pending_diff());
}
