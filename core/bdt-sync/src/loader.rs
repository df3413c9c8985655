//! Load/refresh controller.
//!
//! Fetches a document into its [`LocalDocument`] and exposes the
//! `idle → loading → ready | errored` status. A failed load keeps the
//! previous document; `refetch` can always be retried.

use crate::document::LocalDocument;
use crate::error::{SyncError, SyncResult};
use crate::store::DocumentStore;
use bdt_types::Document;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Phase of the load state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Errored,
}

/// Observable load status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStatus {
    pub state: LoadState,
    /// Message of the last failed load; cleared by a successful one.
    pub error: Option<String>,
}

impl LoadStatus {
    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }
}

/// Loads and reloads one document.
pub struct LoadController<D: Document> {
    store: Arc<dyn DocumentStore<D>>,
    document: Arc<LocalDocument<D>>,
    last_key: Mutex<Option<D::Key>>,
    /// Bumped by every load; only the latest one may apply its result.
    generation: AtomicU64,
    status: watch::Sender<LoadStatus>,
}

impl<D: Document> LoadController<D> {
    pub fn new(store: Arc<dyn DocumentStore<D>>, document: Arc<LocalDocument<D>>) -> Self {
        let (status, _) = watch::channel(LoadStatus::default());
        Self {
            store,
            document,
            last_key: Mutex::new(None),
            generation: AtomicU64::new(0),
            status,
        }
    }

    /// Fetches `key` and, on success, replaces the local document with it.
    ///
    /// On failure the error is recorded in the status and the local document
    /// is left as it was.
    pub async fn load(&self, key: D::Key) -> SyncResult<Arc<D>> {
        *self.last_key.lock().unwrap_or_else(PoisonError::into_inner) = Some(key.clone());
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.status.send_modify(|s| s.state = LoadState::Loading);
        debug!(kind = D::KIND, %key, "loading document");

        let result = self.store.fetch(&key).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(kind = D::KIND, %key, "discarding superseded load");
            return Err(SyncError::Superseded);
        }

        match result {
            Ok(doc) => {
                let snapshot = self.document.replace_from_remote(doc);
                self.status.send_replace(LoadStatus {
                    state: LoadState::Ready,
                    error: None,
                });
                info!(kind = D::KIND, %key, "document loaded");
                Ok(snapshot)
            }
            Err(e) => {
                warn!(kind = D::KIND, %key, "failed to load document: {e}");
                self.status.send_replace(LoadStatus {
                    state: LoadState::Errored,
                    error: Some(e.to_string()),
                });
                Err(e)
            }
        }
    }

    /// Loads the last requested key again.
    pub async fn refetch(&self) -> SyncResult<Arc<D>> {
        let key = self
            .last_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(SyncError::NotLoaded)?;
        self.load(key).await
    }

    pub fn status(&self) -> LoadStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<LoadStatus> {
        self.status.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.status.borrow().is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.status.borrow().error.clone()
    }

    pub fn last_key(&self) -> Option<D::Key> {
        self.last_key.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
