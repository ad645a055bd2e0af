//! End-to-end passes over a real temp directory and in-memory remote stores

mod common;

use common::{at, Harness, MetadataOp, ObjectOp};
use filevault_core::domain::{DiffResult, ItemId, ItemKind, LocalItem, SyncAction};
use filevault_sync::diff::DiffEngine;
use filevault_sync::executor::{ExecutionReport, SyncExecutor};
use filevault_sync::folder_mapper::FolderMapper;
use filevault_sync::progress::ProgressReporter;
use filevault_sync::remote_tree::RemoteTree;
use filevault_sync::scanner::LocalScanner;
use filevault_sync::undo::UndoLog;
use filevault_sync::SyncError;
use tokio_util::sync::CancellationToken;

async fn snapshot(h: &Harness) -> (Vec<LocalItem>, DiffResult) {
    let local = LocalScanner::new(h.fs_port()).scan(&h.base).await.unwrap();
    let remote = RemoteTree::new(h.metadata_port())
        .fetch(&h.root_id, true)
        .await
        .unwrap();
    let diff = DiffEngine::compare(&h.base, &local, &remote).unwrap();
    (local, diff)
}

fn executor(h: &Harness) -> SyncExecutor {
    SyncExecutor::new(h.fs_port(), h.metadata_port(), h.objects_port(), h.owner.clone())
}

async fn push(
    h: &Harness,
    local: &[LocalItem],
    diff: &DiffResult,
    progress: &ProgressReporter,
) -> Result<ExecutionReport, SyncError> {
    let mut undo = UndoLog::new();
    let mapper = FolderMapper::new(h.metadata_port(), h.owner.clone());
    let mapping = match mapper.build(local, &h.base, &h.root_id, &mut undo).await {
        Ok(mapping) => mapping,
        Err(e) => {
            undo.rollback().await;
            return Err(e);
        }
    };
    executor(h)
        .execute_local_to_remote(diff, &mapping, &mut undo, progress)
        .await
}

fn silent() -> ProgressReporter {
    ProgressReporter::silent(CancellationToken::new())
}

// ============================================================================
// Local to remote
// ============================================================================

#[tokio::test]
async fn test_local_to_remote_applies_full_diff() {
    let h = Harness::new();
    h.write_local("A.txt", b"new contents", at(20)).await;
    h.write_local("B/C/note.txt", b"note", at(5)).await;
    let (_, old_a_key) = h.seed_remote_file(&h.root_id, "A.txt", b"old", at(10));
    let (d_id, d_key) = h.seed_remote_file(&h.root_id, "D.txt", b"dee", at(10));

    let (local, diff) = snapshot(&h).await;
    let modified: Vec<&str> = diff.modified().map(|(l, _)| l.path.as_str()).collect();
    let removed: Vec<&str> = diff.removed().map(|r| r.name.as_str()).collect();
    assert_eq!(modified, vec!["A.txt"]);
    assert_eq!(removed, vec!["D.txt"]);
    assert_eq!(diff.action(), SyncAction::Conflict);

    let report = push(&h, &local, &diff, &silent()).await.unwrap();
    assert_eq!(report.uploaded, 2);
    assert_eq!(report.deleted_remote, 1);

    // D.txt gone from both stores
    assert!(h.metadata.get(&d_id).is_none());
    assert!(!h.objects.contains(&d_key));

    // A.txt replaced by exactly one newer record
    let a_records = h.metadata.find_by_local_path(&h.path("A.txt"));
    assert_eq!(a_records.len(), 1);
    let a = &a_records[0];
    assert_eq!(a.last_modified, Some(at(20)));
    assert_eq!(a.parent_id.as_ref(), Some(&h.root_id));
    assert_eq!(h.objects.get(a.storage_key.as_ref().unwrap()).unwrap(), b"new contents");
    assert!(!h.objects.contains(&old_a_key));

    // B/C/note.txt lives under freshly created B/C
    let b = &h.metadata.find_by_local_path(&h.path("B"))[0];
    let c = &h.metadata.find_by_local_path(&h.path("B/C"))[0];
    let note = &h.metadata.find_by_local_path(&h.path("B/C/note.txt"))[0];
    assert_eq!(b.kind, ItemKind::Folder);
    assert_eq!(c.parent_id.as_ref(), Some(&b.id));
    assert_eq!(note.parent_id.as_ref(), Some(&c.id));

    // Fresh scan now matches
    let (_, after) = snapshot(&h).await;
    assert!(after.is_empty(), "unexpected drift: {:?}", after.summary());
}

#[tokio::test]
async fn test_local_to_remote_rerun_is_a_no_op() {
    let h = Harness::new();
    h.write_local("A.txt", b"a", at(20)).await;
    h.write_local("B/x.txt", b"x", at(20)).await;
    h.seed_remote_file(&h.root_id, "D.txt", b"dee", at(10));

    let (local, diff) = snapshot(&h).await;
    push(&h, &local, &diff, &silent()).await.unwrap();
    let metadata_ops = h.metadata.ops().len();
    let object_ops = h.objects.ops().len();

    let report = push(&h, &local, &diff, &silent()).await.unwrap();
    assert_eq!(report.changes(), 0);
    assert_eq!(report.skipped, 3);
    assert_eq!(h.metadata.ops().len(), metadata_ops);
    assert_eq!(h.objects.ops().len(), object_ops);
}

#[tokio::test]
async fn test_remote_folder_deleted_payloads_first_deepest_first() {
    let h = Harness::new();
    let f = h.seed_remote_folder(&h.root_id, "F");
    let g = h.seed_remote_folder(&f, "F/G");
    let (y, y_key) = h.seed_remote_file(&g, "F/G/y.txt", b"y", at(0));
    let (z, z_key) = h.seed_remote_file(&f, "F/z.txt", b"z", at(0));

    let (local, diff) = snapshot(&h).await;
    assert_eq!(diff.action(), SyncAction::RemoteAhead);
    assert_eq!(diff.summary().removed, 4);

    let report = push(&h, &local, &diff, &silent()).await.unwrap();
    assert_eq!(report.deleted_remote, 1);
    assert_eq!(report.skipped, 3);
    assert_eq!(h.metadata.len(), 1);
    assert_eq!(h.objects.len(), 0);

    let mut removed_keys: Vec<ObjectOp> = h.objects.ops();
    removed_keys.sort_by_key(|op| format!("{op:?}"));
    let mut expected = vec![ObjectOp::Remove(y_key), ObjectOp::Remove(z_key)];
    expected.sort_by_key(|op| format!("{op:?}"));
    assert_eq!(removed_keys, expected);

    let deletes: Vec<MetadataOp> = h.metadata.ops();
    let position = |id: ItemId| {
        deletes
            .iter()
            .position(|op| *op == MetadataOp::Delete(id.clone()))
            .unwrap()
    };
    assert!(position(y.clone()) < position(g.clone()));
    assert!(position(g.clone()) < position(f.clone()));
    assert!(position(z.clone()) < position(f.clone()));
    assert_eq!(*deletes.last().unwrap(), MetadataOp::Delete(f));
}

#[tokio::test]
async fn test_failed_upload_rolls_back_earlier_artifacts() {
    let h = Harness::new();
    h.write_local("N/1.txt", b"one", at(1)).await;
    h.write_local("N/2.txt", b"two", at(2)).await;
    h.write_local("N/3.txt", b"three", at(3)).await;
    h.objects.fail_store_on(3, "HTTP 503 service unavailable");

    let (local, diff) = snapshot(&h).await;
    let err = push(&h, &local, &diff, &silent()).await.unwrap_err();
    assert!(matches!(err, SyncError::Network(_)), "got {err:?}");

    // Only the seeded root survives; uploaded payloads and folder N are gone
    assert_eq!(h.metadata.len(), 1);
    assert_eq!(h.objects.len(), 0);
    let stored = h
        .objects
        .ops()
        .into_iter()
        .filter(|op| matches!(op, ObjectOp::Store(_)))
        .count();
    assert_eq!(stored, 2);
}

#[tokio::test]
async fn test_failed_upload_keeps_replaced_remote_copy() {
    let h = Harness::new();
    h.write_local("A.txt", b"new contents", at(20)).await;
    h.write_local("Z.txt", b"zed", at(20)).await;
    let (old_a, old_a_key) = h.seed_remote_file(&h.root_id, "A.txt", b"old", at(10));
    // A.txt uploads first, Z.txt fails
    h.objects.fail_store_on(2, "HTTP 503 service unavailable");

    let (local, diff) = snapshot(&h).await;
    let err = push(&h, &local, &diff, &silent()).await.unwrap_err();
    assert!(matches!(err, SyncError::Network(_)), "got {err:?}");

    // The pre-pass copy of A.txt is untouched and the new one is rolled back
    let a_records = h.metadata.find_by_local_path(&h.path("A.txt"));
    assert_eq!(a_records.len(), 1);
    assert_eq!(a_records[0].id, old_a);
    assert!(h.metadata.get(&old_a).is_some());
    assert_eq!(h.objects.get(&old_a_key).unwrap(), b"old");
    assert_eq!(h.objects.len(), 1);
    assert!(h
        .metadata
        .ops()
        .iter()
        .all(|op| *op != MetadataOp::Delete(old_a.clone())));
}

#[tokio::test]
async fn test_failed_record_creation_rolls_back() {
    let h = Harness::new();
    h.write_local("1.txt", b"one", at(1)).await;
    h.write_local("2.txt", b"two", at(2)).await;
    // first create is 1.txt, second is 2.txt
    h.metadata.fail_create_on(2, "UNIQUE constraint failed");

    let (local, diff) = snapshot(&h).await;
    let err = push(&h, &local, &diff, &silent()).await.unwrap_err();
    assert!(matches!(err, SyncError::Storage(_)), "got {err:?}");
    assert_eq!(h.metadata.len(), 1);
    assert_eq!(h.objects.len(), 0);
}

#[tokio::test]
async fn test_cancelled_push_rolls_back_created_folders() {
    let h = Harness::new();
    h.write_local("B/x.txt", b"x", at(1)).await;
    let token = CancellationToken::new();
    token.cancel();

    let (local, diff) = snapshot(&h).await;
    let err = push(&h, &local, &diff, &ProgressReporter::silent(token))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Cancelled));
    assert_eq!(h.metadata.len(), 1);
}

#[tokio::test]
async fn test_push_emits_progress() {
    let h = Harness::new();
    h.write_local("a.txt", b"a", at(1)).await;
    h.write_local("b.txt", b"b", at(1)).await;
    let (reporter, mut rx) = ProgressReporter::channel(8);

    let (local, diff) = snapshot(&h).await;
    push(&h, &local, &diff, &reporter).await.unwrap();

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!((first.processed, first.total), (1, 2));
    assert_eq!((second.processed, second.total), (2, 2));
    assert!(second.current_file.ends_with("b.txt"));
}

// ============================================================================
// Remote to local
// ============================================================================

#[tokio::test]
async fn test_remote_to_local_two_one_one() {
    let h = Harness::new();
    h.write_local("E1.txt", b"e1", at(5)).await;
    h.write_local("E2.txt", b"e2", at(5)).await;
    h.write_local("A.txt", b"local edit", at(20)).await;
    h.seed_remote_file(&h.root_id, "A.txt", b"remote copy", at(10));
    h.seed_remote_file(&h.root_id, "D.txt", b"dee", at(10));

    let (_, diff) = snapshot(&h).await;
    let summary = diff.summary();
    assert_eq!((summary.added, summary.modified, summary.removed), (2, 1, 1));

    let report = executor(&h)
        .execute_remote_to_local(&diff, &h.base, &silent())
        .await
        .unwrap();
    assert_eq!(report.deleted_local, 2);
    assert_eq!(report.downloaded, 2);
    assert!(h.metadata.ops().is_empty());
    assert!(h.objects.ops().is_empty());

    assert!(h.read_local("E1.txt").is_none());
    assert!(h.read_local("E2.txt").is_none());
    assert_eq!(h.read_local("A.txt").unwrap(), b"remote copy");
    assert_eq!(h.read_local("D.txt").unwrap(), b"dee");

    // Stamped mtimes make the trees match
    let (_, after) = snapshot(&h).await;
    assert!(after.is_empty(), "unexpected drift: {:?}", after.summary());

    // Rerunning the applied diff changes nothing
    let rerun = executor(&h)
        .execute_remote_to_local(&diff, &h.base, &silent())
        .await
        .unwrap();
    assert_eq!(rerun.changes(), 0);
}

#[tokio::test]
async fn test_remote_to_local_materializes_folders() {
    let h = Harness::new();
    let b = h.seed_remote_folder(&h.root_id, "B");
    let c = h.seed_remote_folder(&b, "B/C");
    h.seed_remote_file(&c, "B/C/x.txt", b"x", at(3));

    let (_, diff) = snapshot(&h).await;
    let report = executor(&h)
        .execute_remote_to_local(&diff, &h.base, &silent())
        .await
        .unwrap();

    assert_eq!(report.created_directories, 2);
    assert_eq!(report.downloaded, 1);
    assert!(h.path("B/C").as_path().is_dir());
    assert_eq!(h.read_local("B/C/x.txt").unwrap(), b"x");
}

#[tokio::test]
async fn test_remote_to_local_deletes_local_only_folder() {
    let h = Harness::new();
    h.write_local("Old/inner/file.txt", b"f", at(1)).await;

    let (_, diff) = snapshot(&h).await;
    assert_eq!(diff.summary().added, 3);

    let report = executor(&h)
        .execute_remote_to_local(&diff, &h.base, &silent())
        .await
        .unwrap();
    assert_eq!(report.deleted_local, 1);
    assert_eq!(report.skipped, 2);
    assert!(!h.path("Old").as_path().exists());
}
