mod common;

use bdt_sync::{LoadController, LoadState, LocalDocument, SyncError};
use bdt_types::{EntityId, ScreenerBenefits};
use common::{TestStore, screener};
use pretty_assertions::assert_eq;
use std::sync::Arc;

struct Fixture {
    store: Arc<TestStore<ScreenerBenefits>>,
    document: Arc<LocalDocument<ScreenerBenefits>>,
    loader: Arc<LoadController<ScreenerBenefits>>,
}

fn fixture(store: TestStore<ScreenerBenefits>) -> Fixture {
    let store = Arc::new(store);
    let document = Arc::new(LocalDocument::default());
    let loader = Arc::new(LoadController::new(store.clone(), Arc::clone(&document)));
    Fixture {
        store,
        document,
        loader,
    }
}

fn key(id: &str) -> EntityId {
    EntityId::new(id)
}

// ── Initial state ───────────────────────────────────────────────

#[tokio::test]
async fn starts_idle_with_the_placeholder_document() {
    let f = fixture(TestStore::open());
    let status = f.loader.status();
    assert_eq!(status.state, LoadState::Idle);
    assert_eq!(status.error, None);
    assert!(!f.loader.is_loading());
    assert_eq!(f.loader.last_key(), None);
    assert_eq!(*f.document.get(), ScreenerBenefits::default());
}

#[tokio::test]
async fn refetch_before_load_fails() {
    let f = fixture(TestStore::open());
    let err = f.loader.refetch().await.unwrap_err();
    assert!(matches!(err, SyncError::NotLoaded));
    assert_eq!(f.store.fetch_calls(), 0);
}

// ── Loading ─────────────────────────────────────────────────────

#[tokio::test]
async fn load_replaces_the_document_and_becomes_ready() {
    let f = fixture(TestStore::gated_fetches());
    f.store.seed(key("s1"), screener("s1", &[("a", "A")])).await;

    let loader = Arc::clone(&f.loader);
    let task = tokio::spawn(async move { loader.load(key("s1")).await });
    f.store.wait_for_fetches(1).await;
    assert!(f.loader.is_loading());

    f.store.release_fetches(1);
    let snapshot = task.await.unwrap().unwrap();

    assert_eq!(snapshot.benefits.len(), 1);
    assert_eq!(*f.document.get(), *snapshot);
    assert_eq!(f.loader.status().state, LoadState::Ready);
    assert_eq!(f.loader.last_key(), Some(key("s1")));
}

#[tokio::test]
async fn failed_load_keeps_the_previous_document() {
    let f = fixture(TestStore::open());
    f.store.seed(key("s1"), screener("s1", &[("a", "A")])).await;
    f.loader.load(key("s1")).await.unwrap();

    f.store.fail_next_fetch(SyncError::Status {
        status: 503,
        body: "unavailable".into(),
    });
    let err = f.loader.refetch().await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(f.loader.status().state, LoadState::Errored);
    assert!(f.loader.error().unwrap().contains("503"));
    assert_eq!(f.document.get().benefits.len(), 1);
}

#[tokio::test]
async fn missing_document_is_reported_as_an_error() {
    let f = fixture(TestStore::open());
    let err = f.loader.load(key("nope")).await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));
    assert_eq!(f.loader.status().state, LoadState::Errored);
    assert_eq!(*f.document.get(), ScreenerBenefits::default());
}

#[tokio::test]
async fn refetch_after_an_error_recovers() {
    let f = fixture(TestStore::open());
    f.store.fail_next_fetch(SyncError::Network("connection refused".into()));
    f.store.seed(key("s1"), screener("s1", &[("a", "A")])).await;

    assert!(f.loader.load(key("s1")).await.is_err());
    assert!(f.loader.error().is_some());

    f.loader.refetch().await.unwrap();
    assert_eq!(f.loader.status().state, LoadState::Ready);
    assert_eq!(f.loader.error(), None);
    assert_eq!(f.document.get().benefits.len(), 1);
}

// ── Overlapping loads ───────────────────────────────────────────

#[tokio::test]
async fn superseded_load_does_not_overwrite_a_newer_one() {
    let f = fixture(TestStore::gated_fetches());
    f.store.seed(key("s1"), screener("s1", &[("a", "Old")])).await;

    let first = {
        let loader = Arc::clone(&f.loader);
        tokio::spawn(async move { loader.load(key("s1")).await })
    };
    f.store.wait_for_fetches(1).await;
    let second = {
        let loader = Arc::clone(&f.loader);
        tokio::spawn(async move { loader.load(key("s1")).await })
    };
    f.store.wait_for_fetches(2).await;

    // The first fetch answers with the old state, then the server moves on.
    f.store.release_fetches(1);
    let first = first.await.unwrap();
    f.store.seed(key("s1"), screener("s1", &[("a", "New")])).await;
    f.store.release_fetches(1);
    let second = second.await.unwrap().unwrap();

    assert!(matches!(first, Err(SyncError::Superseded)));
    assert_eq!(second.benefits[0].name, "New");
    assert_eq!(f.document.get().benefits[0].name, "New");
    assert_eq!(f.loader.status().state, LoadState::Ready);
}

#[tokio::test]
async fn status_receiver_sees_loading_then_ready() {
    let f = fixture(TestStore::gated_fetches());
    f.store.seed(key("s1"), screener("s1", &[])).await;
    let mut rx = f.loader.subscribe_status();

    let loader = Arc::clone(&f.loader);
    let task = tokio::spawn(async move { loader.load(key("s1")).await });

    rx.wait_for(|s| s.is_loading()).await.unwrap();
    f.store.release_fetches(1);
    rx.wait_for(|s| s.state == LoadState::Ready).await.unwrap();
    task.await.unwrap().unwrap();
}
