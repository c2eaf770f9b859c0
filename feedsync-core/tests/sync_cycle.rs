mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{engine_with, DocumentState, MockObjectStore};
use feedsync_core::{CycleOutcome, PublishError, SyncError};

#[tokio::test]
async fn stale_manifest_is_replaced_end_to_end() {
    let object = Arc::new(MockObjectStore::with_files(&["/hls/a.mp4", "/hls/b.mp4"]));
    let state = DocumentState::published("rev-0", &["https://host/a.mp4?raw=1"]);
    let engine = engine_with(object, state.clone(), false);

    let report = engine.run_cycle().await.unwrap();
    assert_eq!(
        report.urls,
        vec![
            "https://host/hls/a.mp4?raw=1".to_string(),
            "https://host/hls/b.mp4?raw=1".to_string(),
        ]
    );
    match &report.outcome {
        CycleOutcome::Published { revision } => assert_ne!(revision, "rev-0"),
        other => panic!("expected a publish, got {other:?}"),
    }

    let published = state.lock().unwrap();
    assert_eq!(published.content.as_ref().unwrap().len(), 2);
    assert_eq!(published.writes, 1);
}

#[tokio::test]
async fn second_cycle_over_unchanged_storage_skips() {
    let object = Arc::new(MockObjectStore::with_files(&["/hls/a.mp4", "/hls/b.mp4"]));
    let state = DocumentState::published("rev-0", &[]);
    let engine = engine_with(object, state.clone(), false);

    let first = engine.run_cycle().await.unwrap();
    assert!(matches!(first.outcome, CycleOutcome::Published { .. }));

    let second = engine.run_cycle().await.unwrap();
    assert_eq!(second.outcome, CycleOutcome::Skipped);
    assert_eq!(second.urls, first.urls);
    assert_eq!(state.lock().unwrap().writes, 1);
}

#[tokio::test]
async fn unreadable_baseline_still_publishes() {
    let object = Arc::new(MockObjectStore::with_files(&["/hls/a.mp4"]));
    // document absent entirely: published fetch 404s, metadata read has no
    // revision, so this is also the create path
    let state = DocumentState::empty();
    let engine = engine_with(object, state.clone(), false);

    let report = engine.run_cycle().await.unwrap();
    assert!(matches!(report.outcome, CycleOutcome::Published { .. }));
    assert_eq!(state.lock().unwrap().revision.as_deref(), Some("rev-1"));
}

#[tokio::test]
async fn rejected_write_surfaces_as_publish_error() {
    let object = Arc::new(MockObjectStore::with_files(&["/hls/a.mp4"]));
    let state = DocumentState::published("rev-0", &[]);
    let engine = engine_with(object, state.clone(), true);

    let err = engine.run_cycle().await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Publish(PublishError::Rejected { status: 409, .. })
    ));
    // the losing writer changed nothing
    assert_eq!(state.lock().unwrap().writes, 0);
}

#[tokio::test]
async fn link_resolution_failure_aborts_without_partial_publish() {
    let mut object = MockObjectStore::with_files(&["/hls/a.mp4", "/hls/b.mp4"]);
    object.fail_create_for = Some("/hls/b.mp4".to_string());
    let object = Arc::new(object);
    let state = DocumentState::published("rev-0", &[]);
    let engine = engine_with(object.clone(), state.clone(), false);

    let err = engine.run_cycle().await.unwrap_err();
    assert!(matches!(err, SyncError::List(_)));
    assert_eq!(object.list_calls.load(Ordering::SeqCst), 1);
    // nothing was written: stale beats partial
    let published = state.lock().unwrap();
    assert_eq!(published.writes, 0);
    assert_eq!(published.content.as_ref().map(Vec::len), Some(0));
}
