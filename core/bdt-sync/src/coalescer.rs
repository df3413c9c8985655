//! Write coalescer.
//!
//! Keeps at most one write per document in flight. Changes that arrive while
//! a write is outstanding overwrite a single pending slot; when the write
//! finishes (successfully or not) the pending snapshot, if any, is written
//! next. Under rapid editing the server therefore sees the first state after
//! idle and then only the latest state, never a growing queue.

use crate::error::{SyncError, SyncResult};
use crate::store::DocumentStore;
use bdt_types::Document;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Configuration for the write path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteConfig {
    /// Extra attempts for a failed write that nothing newer supersedes.
    pub max_retries: u32,
    /// Backoff before retry `n` is `n * retry_backoff_ms`.
    pub retry_backoff_ms: u64,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_backoff_ms: 500,
        }
    }
}

/// Observable state of the write path, for "saving…" indicators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveStatus {
    /// A write request is outstanding.
    pub in_flight: bool,
    /// A newer snapshot is waiting for the outstanding write to finish.
    pub pending: bool,
    /// Write requests started, retries included.
    pub writes_issued: u64,
    pub writes_failed: u64,
    /// Error of the most recent write, cleared by the next success.
    pub last_error: Option<String>,
}

impl SaveStatus {
    /// Whether local changes may not have reached the server yet.
    pub fn is_saving(&self) -> bool {
        self.in_flight || self.pending
    }
}

struct WriteSlot<D> {
    in_flight: bool,
    pending: Option<(u64, Arc<D>)>,
    /// Newest revision accepted for writing or replaced by a fetch. Older
    /// snapshots arriving late are dropped.
    latest: u64,
}

struct Shared<D: Document> {
    key: D::Key,
    store: Arc<dyn DocumentStore<D>>,
    config: WriteConfig,
    slot: Mutex<WriteSlot<D>>,
    status: watch::Sender<SaveStatus>,
}

impl<D: Document> Shared<D> {
    fn lock_slot(&self) -> MutexGuard<'_, WriteSlot<D>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes `first`, then keeps draining the pending slot until it is
    /// empty. The in-flight flag stays set across the hand-over so no other
    /// caller can start a concurrent write.
    async fn flush(self: Arc<Self>, first: Arc<D>) {
        let mut next = Some(first);
        while let Some(snapshot) = next.take() {
            self.write(&snapshot).await;

            next = {
                let mut slot = self.lock_slot();
                let pending = slot.pending.take().map(|(_, snapshot)| snapshot);
                slot.in_flight = pending.is_some();
                let in_flight = slot.in_flight;
                self.status.send_modify(|s| {
                    s.in_flight = in_flight;
                    s.pending = false;
                });
                pending
            };
        }
    }

    async fn write(&self, snapshot: &D) {
        let written_at = self.lock_slot().latest;
        let mut attempt: u32 = 0;
        loop {
            self.status.send_modify(|s| s.writes_issued += 1);
            debug!(kind = D::KIND, key = %self.key, attempt, "writing document");

            match self.store.replace(&self.key, snapshot).await {
                Ok(()) => {
                    self.status.send_modify(|s| s.last_error = None);
                    return;
                }
                Err(e) => {
                    warn!(
                        kind = D::KIND,
                        key = %self.key,
                        store = self.store.store_name(),
                        "failed to write document: {e}"
                    );
                    self.status.send_modify(|s| {
                        s.writes_failed += 1;
                        s.last_error = Some(e.to_string());
                    });

                    let superseded = {
                        let slot = self.lock_slot();
                        slot.pending.is_some() || slot.latest != written_at
                    };
                    if superseded || attempt >= self.config.max_retries {
                        return;
                    }
                    attempt += 1;
                    let backoff = self.config.retry_backoff_ms.saturating_mul(u64::from(attempt));
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
            }
        }
    }
}

/// Coalesces document changes into single-flight full-document writes.
///
/// Cloning yields another handle to the same coalescer.
pub struct WriteCoalescer<D: Document> {
    shared: Arc<Shared<D>>,
    runtime: Handle,
}

impl<D: Document> Clone for WriteCoalescer<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            runtime: self.runtime.clone(),
        }
    }
}

impl<D: Document> WriteCoalescer<D> {
    /// Creates a coalescer writing to `key` in `store`.
    ///
    /// Must be called from within a tokio runtime; writes are spawned on it.
    pub fn new(key: D::Key, store: Arc<dyn DocumentStore<D>>, config: WriteConfig) -> SyncResult<Self> {
        let runtime = Handle::try_current().map_err(|e| SyncError::Runtime(e.to_string()))?;
        let (status, _) = watch::channel(SaveStatus::default());
        Ok(Self {
            shared: Arc::new(Shared {
                key,
                store,
                config,
                slot: Mutex::new(WriteSlot {
                    in_flight: false,
                    pending: None,
                    latest: 0,
                }),
                status,
            }),
            runtime,
        })
    }

    pub fn key(&self) -> &D::Key {
        &self.shared.key
    }

    /// Schedules `snapshot` for writing.
    ///
    /// Starts a write immediately when none is in flight; otherwise the
    /// snapshot replaces whatever was pending and is written once the
    /// current request completes. Never blocks and never fails; write errors
    /// are logged and reported through [`status`](Self::status).
    pub fn on_document_changed(&self, snapshot: Arc<D>) {
        self.schedule(None, snapshot);
    }

    /// Like [`on_document_changed`](Self::on_document_changed) for a snapshot
    /// taken at document revision `revision`. A snapshot older than one
    /// already scheduled is ignored, so changes notified out of order from
    /// different threads never leave a stale document as the last write.
    pub fn on_revision(&self, revision: u64, snapshot: Arc<D>) {
        self.schedule(Some(revision), snapshot);
    }

    fn schedule(&self, revision: Option<u64>, snapshot: Arc<D>) {
        let start = {
            let mut slot = self.shared.lock_slot();
            let revision = revision.unwrap_or(slot.latest + 1);
            if revision <= slot.latest {
                debug!(kind = D::KIND, key = %self.shared.key, revision, "ignoring stale snapshot");
                return;
            }
            slot.latest = revision;
            if slot.in_flight {
                slot.pending = Some((revision, snapshot));
                self.shared.status.send_modify(|s| s.pending = true);
                None
            } else {
                // Set before the write is spawned; a second change arriving
                // before the task runs must see the flag.
                slot.in_flight = true;
                self.shared.status.send_modify(|s| s.in_flight = true);
                Some(snapshot)
            }
        };

        if let Some(snapshot) = start {
            let shared = Arc::clone(&self.shared);
            self.runtime.spawn(shared.flush(snapshot));
        }
    }

    /// Drops pending work made obsolete by a fetched copy of the document at
    /// `revision`. A write already in flight still completes. Returns whether
    /// a pending snapshot was discarded.
    pub fn supersede(&self, revision: u64) -> bool {
        let mut slot = self.shared.lock_slot();
        slot.latest = slot.latest.max(revision);
        let stale = matches!(slot.pending, Some((pending, _)) if pending < revision);
        if stale {
            slot.pending = None;
            self.shared.status.send_modify(|s| s.pending = false);
            debug!(kind = D::KIND, key = %self.shared.key, "discarded pending snapshot");
        }
        stale
    }

    /// Current save status.
    pub fn status(&self) -> SaveStatus {
        self.shared.status.borrow().clone()
    }

    /// Receiver notified on every save status change.
    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.shared.status.subscribe()
    }

    pub fn is_in_flight(&self) -> bool {
        self.shared.lock_slot().in_flight
    }

    pub fn has_pending(&self) -> bool {
        self.shared.lock_slot().pending.is_some()
    }

    /// Resolves once no write is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.status.subscribe();
        // `self.shared` keeps the sender alive, so the channel cannot close.
        let _ = rx.wait_for(|s| !s.in_flight).await;
    }
}
