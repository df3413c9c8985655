mod common;

use bdt_sync::{SyncError, WriteCoalescer, WriteConfig};
use bdt_types::{EntityId, ScreenerBenefits};
use common::{TestStore, init_tracing, screener};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn key() -> EntityId {
    EntityId::new("s1")
}

fn revision(n: usize) -> Arc<ScreenerBenefits> {
    let mut doc = screener("s1", &[]);
    doc.screener_name = format!("rev {n}");
    Arc::new(doc)
}

fn names(docs: &[ScreenerBenefits]) -> Vec<String> {
    docs.iter().map(|d| d.screener_name.clone()).collect()
}

fn coalescer(store: &Arc<TestStore<ScreenerBenefits>>, config: WriteConfig) -> WriteCoalescer<ScreenerBenefits> {
    WriteCoalescer::new(key(), store.clone(), config).unwrap()
}

// ── Construction ────────────────────────────────────────────────

#[test]
fn write_config_default() {
    let config = WriteConfig::default();
    assert_eq!(config.max_retries, 0);
    assert_eq!(config.retry_backoff_ms, 500);
}

#[test]
fn creating_outside_a_runtime_fails() {
    let store = Arc::new(TestStore::<ScreenerBenefits>::open());
    let result = WriteCoalescer::<ScreenerBenefits>::new(key(), store, WriteConfig::default());
    assert!(matches!(result, Err(SyncError::Runtime(_))));
}

#[tokio::test]
async fn idle_coalescer_reports_nothing_to_save() {
    let store = Arc::new(TestStore::open());
    let writer = coalescer(&store, WriteConfig::default());
    assert!(!writer.status().is_saving());
    assert!(!writer.is_in_flight());
    assert!(!writer.has_pending());
    assert_eq!(writer.key(), &key());
}

// ── Single flight ───────────────────────────────────────────────

#[tokio::test]
async fn first_change_after_idle_is_written_immediately() {
    let store = Arc::new(TestStore::gated_writes());
    let writer = coalescer(&store, WriteConfig::default());

    writer.on_document_changed(revision(1));
    assert!(writer.is_in_flight());
    assert!(writer.status().in_flight);

    store.wait_for_replaces(1).await;
    assert_eq!(names(&store.written()), vec!["rev 1"]);

    store.release_writes(1);
    writer.wait_idle().await;
    assert_eq!(store.replace_calls(), 1);
    assert_eq!(store.stored(&key()).await.unwrap().screener_name, "rev 1");
    assert!(!writer.status().is_saving());
}

#[tokio::test]
async fn changes_during_a_write_collapse_into_the_latest() {
    let store = Arc::new(TestStore::gated_writes());
    let writer = coalescer(&store, WriteConfig::default());

    writer.on_document_changed(revision(1));
    store.wait_for_replaces(1).await;

    writer.on_document_changed(revision(2));
    writer.on_document_changed(revision(3));
    writer.on_document_changed(revision(4));
    assert!(writer.has_pending());
    assert!(writer.status().pending);
    assert_eq!(store.replace_calls(), 1);

    store.release_writes(1);
    store.wait_for_replaces(2).await;
    store.release_writes(1);
    writer.wait_idle().await;

    assert_eq!(names(&store.written()), vec!["rev 1", "rev 4"]);
    assert_eq!(store.max_concurrent_writes(), 1);
    assert_eq!(writer.status().writes_issued, 2);
    assert!(!writer.has_pending());
}

#[tokio::test]
async fn completion_without_pending_issues_no_further_write() {
    let store = Arc::new(TestStore::open());
    let writer = coalescer(&store, WriteConfig::default());

    writer.on_document_changed(revision(1));
    writer.wait_idle().await;
    tokio::task::yield_now().await;

    assert_eq!(store.replace_calls(), 1);
    assert!(!writer.is_in_flight());
}

#[tokio::test]
async fn a_new_change_after_idle_starts_a_new_write() {
    let store = Arc::new(TestStore::open());
    let writer = coalescer(&store, WriteConfig::default());

    writer.on_document_changed(revision(1));
    writer.wait_idle().await;
    writer.on_document_changed(revision(2));
    writer.wait_idle().await;

    assert_eq!(names(&store.written()), vec!["rev 1", "rev 2"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rapid_edits_never_overlap_and_end_at_the_last_state() {
    let store = Arc::new(TestStore::open());
    let writer = coalescer(&store, WriteConfig::default());

    for n in 1..=200 {
        writer.on_document_changed(revision(n));
        if n % 7 == 0 {
            tokio::task::yield_now().await;
        }
    }
    writer.wait_idle().await;

    assert_eq!(store.max_concurrent_writes(), 1);
    assert!(store.replace_calls() <= 200);
    assert_eq!(store.stored(&key()).await.unwrap().screener_name, "rev 200");
    assert_eq!(store.written().last().unwrap().screener_name, "rev 200");
}

// ── Failures ────────────────────────────────────────────────────

#[tokio::test]
async fn failed_write_is_reported_and_released() {
    let store = Arc::new(TestStore::open());
    let writer = coalescer(&store, WriteConfig::default());
    store.fail_next_replace(SyncError::Status {
        status: 500,
        body: "boom".into(),
    });

    writer.on_document_changed(revision(1));
    writer.wait_idle().await;

    let status = writer.status();
    assert_eq!(store.replace_calls(), 1);
    assert_eq!(status.writes_failed, 1);
    assert!(status.last_error.unwrap().contains("500"));
    assert!(!status.in_flight);
    assert!(store.stored(&key()).await.is_none());

    // The next edit is written normally and clears the error.
    writer.on_document_changed(revision(2));
    writer.wait_idle().await;
    assert_eq!(writer.status().last_error, None);
    assert_eq!(store.stored(&key()).await.unwrap().screener_name, "rev 2");
}

#[tokio::test]
async fn pending_snapshot_is_flushed_after_a_failed_write() {
    let store = Arc::new(TestStore::gated_writes());
    let writer = coalescer(&store, WriteConfig::default());
    store.fail_next_replace(SyncError::Network("connection reset".into()));

    writer.on_document_changed(revision(1));
    store.wait_for_replaces(1).await;
    writer.on_document_changed(revision(2));

    store.release_writes(2);
    writer.wait_idle().await;

    assert_eq!(names(&store.written()), vec!["rev 1", "rev 2"]);
    assert_eq!(store.stored(&key()).await.unwrap().screener_name, "rev 2");
    assert_eq!(writer.status().writes_failed, 1);
    assert_eq!(writer.status().last_error, None);
}

#[tokio::test]
async fn failed_write_is_retried_when_configured() {
    let store = Arc::new(TestStore::open());
    let config = WriteConfig {
        max_retries: 2,
        retry_backoff_ms: 5,
    };
    let writer = coalescer(&store, config);
    store.fail_next_replace(SyncError::Network("timeout".into()));

    writer.on_document_changed(revision(1));
    writer.wait_idle().await;

    assert_eq!(names(&store.written()), vec!["rev 1", "rev 1"]);
    assert_eq!(writer.status().writes_issued, 2);
    assert_eq!(store.stored(&key()).await.unwrap().screener_name, "rev 1");
}

#[tokio::test(start_paused = true)]
async fn retries_back_off_linearly() {
    init_tracing();
    let store = Arc::new(TestStore::open());
    let config = WriteConfig {
        max_retries: 2,
        retry_backoff_ms: 500,
    };
    let writer = coalescer(&store, config);
    store.fail_next_replace(SyncError::Network("down".into()));
    store.fail_next_replace(SyncError::Network("down".into()));

    let started = tokio::time::Instant::now();
    writer.on_document_changed(revision(1));
    writer.wait_idle().await;

    // 500 ms before the first retry, 1000 ms before the second.
    assert!(started.elapsed() >= std::time::Duration::from_millis(1500));
    assert_eq!(store.replace_calls(), 3);
    assert_eq!(writer.status().last_error, None);
}

#[tokio::test]
async fn retries_stop_after_the_configured_limit() {
    let store = Arc::new(TestStore::open());
    let config = WriteConfig {
        max_retries: 1,
        retry_backoff_ms: 1,
    };
    let writer = coalescer(&store, config);
    for _ in 0..3 {
        store.fail_next_replace(SyncError::Network("down".into()));
    }

    writer.on_document_changed(revision(1));
    writer.wait_idle().await;

    assert_eq!(store.replace_calls(), 2);
    assert_eq!(writer.status().writes_failed, 2);
}

#[tokio::test]
async fn newer_pending_snapshot_replaces_a_retry() {
    let store = Arc::new(TestStore::gated_writes());
    let config = WriteConfig {
        max_retries: 3,
        retry_backoff_ms: 1,
    };
    let writer = coalescer(&store, config);
    store.fail_next_replace(SyncError::Network("down".into()));

    writer.on_document_changed(revision(1));
    store.wait_for_replaces(1).await;
    writer.on_document_changed(revision(2));

    store.release_writes(2);
    writer.wait_idle().await;

    assert_eq!(names(&store.written()), vec!["rev 1", "rev 2"]);
}

// ── Revisions ───────────────────────────────────────────────────

#[tokio::test]
async fn late_notification_of_an_older_revision_is_ignored() {
    let store = Arc::new(TestStore::gated_writes());
    let writer = coalescer(&store, WriteConfig::default());

    writer.on_revision(1, revision(1));
    writer.on_revision(3, revision(3));
    // Revision 2 was committed before 3 but its notification lost the race.
    writer.on_revision(2, revision(2));

    store.release_writes(2);
    writer.wait_idle().await;
    assert_eq!(names(&store.written()), vec!["rev 1", "rev 3"]);
    assert_eq!(store.stored(&key()).await.unwrap().screener_name, "rev 3");
}

#[tokio::test]
async fn fetched_copy_discards_an_older_pending_snapshot() {
    let store = Arc::new(TestStore::gated_writes());
    let writer = coalescer(&store, WriteConfig::default());

    writer.on_revision(1, revision(1));
    writer.on_revision(2, revision(2));
    assert!(writer.has_pending());

    assert!(writer.supersede(3));
    assert!(!writer.has_pending());
    assert!(!writer.status().pending);

    // Anything at or below the fetched revision is already outdated.
    writer.on_revision(3, revision(3));
    assert!(!writer.has_pending());

    store.release_writes(1);
    writer.wait_idle().await;
    assert_eq!(names(&store.written()), vec!["rev 1"]);
}

#[tokio::test]
async fn newer_pending_snapshot_survives_a_fetch() {
    let store = Arc::new(TestStore::gated_writes());
    let writer = coalescer(&store, WriteConfig::default());

    writer.on_revision(1, revision(1));
    writer.on_revision(5, revision(5));
    assert!(!writer.supersede(4));
    assert!(writer.has_pending());

    store.release_writes(2);
    writer.wait_idle().await;
    assert_eq!(names(&store.written()), vec!["rev 1", "rev 5"]);
}

// ── Status ──────────────────────────────────────────────────────

#[tokio::test]
async fn status_receiver_observes_saving_and_saved() {
    let store = Arc::new(TestStore::gated_writes());
    let writer = coalescer(&store, WriteConfig::default());
    let mut rx = writer.subscribe_status();

    writer.on_document_changed(revision(1));
    assert!(rx.borrow_and_update().is_saving());

    store.release_writes(1);
    let status = rx.wait_for(|s| !s.is_saving()).await.unwrap().clone();
    assert_eq!(status.writes_issued, 1);
    assert_eq!(status.writes_failed, 0);
}

#[tokio::test]
async fn clones_share_the_same_write_slot() {
    let store = Arc::new(TestStore::gated_writes());
    let writer = coalescer(&store, WriteConfig::default());
    let other = writer.clone();

    writer.on_document_changed(revision(1));
    other.on_document_changed(revision(2));
    assert!(writer.has_pending());

    store.release_writes(2);
    other.wait_idle().await;
    assert_eq!(names(&store.written()), vec!["rev 1", "rev 2"]);
}
