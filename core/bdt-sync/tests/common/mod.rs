//! Shared fixtures for the synchronizer tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bdt_sync::{CheckActions, DocumentStore, MemoryDocumentStore, SyncError, SyncResult};
use bdt_types::{
    Benefit, BenefitDetail, CheckConfig, Document, EligibilityCheckDetail, EntityId,
    ParameterDefinition, ParameterType, ScreenerBenefits,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Routes the crate's log output through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("bdt_sync=debug")
        .with_test_writer()
        .try_init();
}

/// Document store that records every write and can hold writes and fetches
/// until the test releases them.
pub struct TestStore<D: Document> {
    inner: MemoryDocumentStore<D>,
    replace_gate: Semaphore,
    fetch_gate: Semaphore,
    written: Mutex<Vec<D>>,
    replace_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    active_writes: AtomicUsize,
    max_active_writes: AtomicUsize,
    replace_failures: Mutex<VecDeque<SyncError>>,
    fetch_failures: Mutex<VecDeque<SyncError>>,
}

fn gate(open: bool) -> Semaphore {
    Semaphore::new(if open { Semaphore::MAX_PERMITS } else { 0 })
}

impl<D: Document> TestStore<D> {
    fn with_gates(writes_open: bool, fetches_open: bool) -> Self {
        Self {
            inner: MemoryDocumentStore::new(),
            replace_gate: gate(writes_open),
            fetch_gate: gate(fetches_open),
            written: Mutex::new(Vec::new()),
            replace_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            active_writes: AtomicUsize::new(0),
            max_active_writes: AtomicUsize::new(0),
            replace_failures: Mutex::new(VecDeque::new()),
            fetch_failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Store answering every call immediately.
    pub fn open() -> Self {
        Self::with_gates(true, true)
    }

    /// Store holding each write until [`release_writes`](Self::release_writes).
    pub fn gated_writes() -> Self {
        Self::with_gates(false, true)
    }

    /// Store holding each fetch until [`release_fetches`](Self::release_fetches).
    pub fn gated_fetches() -> Self {
        Self::with_gates(true, false)
    }

    pub async fn seed(&self, key: D::Key, doc: D) {
        self.inner.insert(key, doc).await;
    }

    pub async fn stored(&self, key: &D::Key) -> Option<D> {
        self.inner.get(key).await
    }

    pub fn release_writes(&self, n: usize) {
        self.replace_gate.add_permits(n);
    }

    pub fn release_fetches(&self, n: usize) {
        self.fetch_gate.add_permits(n);
    }

    pub fn fail_next_replace(&self, error: SyncError) {
        self.replace_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_fetch(&self, error: SyncError) {
        self.fetch_failures.lock().unwrap().push_back(error);
    }

    /// Payloads of every write, in the order the writes started.
    pub fn written(&self) -> Vec<D> {
        self.written.lock().unwrap().clone()
    }

    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_writes(&self) -> usize {
        self.max_active_writes.load(Ordering::SeqCst)
    }

    pub async fn wait_for_replaces(&self, n: usize) {
        wait_until(|| self.replace_calls() >= n).await;
    }

    pub async fn wait_for_fetches(&self, n: usize) {
        wait_until(|| self.fetch_calls() >= n).await;
    }

    async fn pass(gate: &Semaphore) {
        gate.acquire().await.unwrap().forget();
    }
}

#[async_trait]
impl<D: Document> DocumentStore<D> for TestStore<D> {
    fn store_name(&self) -> &'static str {
        "test"
    }

    async fn fetch(&self, key: &D::Key) -> SyncResult<D> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.fetch_gate).await;
        let failure = self.fetch_failures.lock().unwrap().pop_front();
        if let Some(e) = failure {
            return Err(e);
        }
        self.inner.fetch(key).await
    }

    async fn replace(&self, key: &D::Key, doc: &D) -> SyncResult<()> {
        self.written.lock().unwrap().push(doc.clone());
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active_writes.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_writes.fetch_max(active, Ordering::SeqCst);

        Self::pass(&self.replace_gate).await;
        self.active_writes.fetch_sub(1, Ordering::SeqCst);

        let failure = self.replace_failures.lock().unwrap().pop_front();
        if let Some(e) = failure {
            return Err(e);
        }
        self.inner.replace(key, doc).await
    }

    async fn add_child(&self, key: &D::Key, child: &D::Child) -> SyncResult<()> {
        self.inner.add_child(key, child).await
    }

    async fn remove_child(&self, key: &D::Key, child_id: &EntityId) -> SyncResult<()> {
        self.inner.remove_child(key, child_id).await
    }
}

#[async_trait]
impl CheckActions for TestStore<EligibilityCheckDetail> {
    async fn save_dmn_model(&self, check_id: &EntityId, dmn_model: &str) -> SyncResult<()> {
        self.inner.save_dmn_model(check_id, dmn_model).await
    }

    async fn publish_check(&self, check_id: &EntityId) -> SyncResult<()> {
        self.inner.publish_check(check_id).await
    }
}

/// Polls `done` until it holds, failing the test after five seconds.
pub async fn wait_until(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ── Sample documents ────────────────────────────────────────────

pub fn benefit_detail(id: &str, name: &str) -> BenefitDetail {
    BenefitDetail {
        id: id.into(),
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn screener(id: &str, benefits: &[(&str, &str)]) -> ScreenerBenefits {
    ScreenerBenefits {
        id: id.into(),
        screener_name: "Senior programs".to_string(),
        benefits: benefits.iter().map(|(id, name)| benefit_detail(id, name)).collect(),
        ..Default::default()
    }
}

pub fn benefit(id: &str, checks: &[&str]) -> Benefit {
    Benefit {
        id: id.into(),
        name: "Property tax relief".to_string(),
        checks: checks.iter().map(|c| CheckConfig::new(*c, format!("{c} check"))).collect(),
        ..Default::default()
    }
}

pub fn eligibility_check(id: &str, parameter_keys: &[&str]) -> EligibilityCheckDetail {
    EligibilityCheckDetail {
        id: id.into(),
        name: "Age check".to_string(),
        module: "age".to_string(),
        version: 1,
        parameters: parameter_keys
            .iter()
            .map(|k| ParameterDefinition::new(*k, *k, ParameterType::Number))
            .collect(),
        ..Default::default()
    }
}
