//! Shared plumbing of every editor: one document, its write coalescer, its
//! load controller and the action-in-progress flag.

use crate::coalescer::{SaveStatus, WriteCoalescer, WriteConfig};
use crate::document::{ChangeOrigin, LocalDocument, SubscriptionId};
use crate::error::{SyncError, SyncResult};
use crate::loader::{LoadController, LoadStatus};
use crate::store::DocumentStore;
use bdt_types::Document;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Clears the action flag when the action finishes, however it finishes.
struct ActionGuard<'a>(&'a AtomicBool);

impl<'a> ActionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> SyncResult<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SyncError::ActionInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One editing session over a single document.
///
/// Local edits are persisted by the coalescer; documents replaced by a
/// fetch are never written back.
pub struct EditorSession<D: Document> {
    key: D::Key,
    store: Arc<dyn DocumentStore<D>>,
    document: Arc<LocalDocument<D>>,
    coalescer: WriteCoalescer<D>,
    loader: LoadController<D>,
    action_in_progress: AtomicBool,
    subscription: SubscriptionId,
}

impl<D: Document> EditorSession<D> {
    /// Creates a session for `key` starting from the empty document.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(key: D::Key, store: Arc<dyn DocumentStore<D>>, config: WriteConfig) -> SyncResult<Self> {
        Self::with_initial(key, store, config, D::default())
    }

    /// Creates a session starting from `initial`, e.g. for a document that
    /// was just created locally and has not been fetched.
    pub fn with_initial(
        key: D::Key,
        store: Arc<dyn DocumentStore<D>>,
        config: WriteConfig,
        initial: D,
    ) -> SyncResult<Self> {
        let document = Arc::new(LocalDocument::new(initial));
        let coalescer = WriteCoalescer::new(key.clone(), Arc::clone(&store), config)?;
        let loader = LoadController::new(Arc::clone(&store), Arc::clone(&document));

        let writer = coalescer.clone();
        let subscription = document.subscribe(move |change| match change.origin {
            ChangeOrigin::Local => writer.on_revision(change.revision, Arc::clone(&change.snapshot)),
            ChangeOrigin::Remote => {
                writer.supersede(change.revision);
            }
        });

        Ok(Self {
            key,
            store,
            document,
            coalescer,
            loader,
            action_in_progress: AtomicBool::new(false),
            subscription,
        })
    }

    pub fn key(&self) -> &D::Key {
        &self.key
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore<D>> {
        &self.store
    }

    pub fn document(&self) -> &Arc<LocalDocument<D>> {
        &self.document
    }

    pub fn coalescer(&self) -> &WriteCoalescer<D> {
        &self.coalescer
    }

    pub fn loader(&self) -> &LoadController<D> {
        &self.loader
    }

    /// Current document snapshot.
    pub fn data(&self) -> Arc<D> {
        self.document.get()
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    /// Error of the last failed load.
    pub fn error(&self) -> Option<String> {
        self.loader.error()
    }

    pub fn load_status(&self) -> LoadStatus {
        self.loader.status()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.coalescer.status()
    }

    /// Whether a server-computed action is running.
    pub fn action_in_progress(&self) -> bool {
        self.action_in_progress.load(Ordering::SeqCst)
    }

    /// Initial fetch of the session's document.
    pub async fn load(&self) -> SyncResult<Arc<D>> {
        self.loader.load(self.key.clone()).await
    }

    pub async fn refetch(&self) -> SyncResult<Arc<D>> {
        self.loader.refetch().await
    }

    /// Resolves once every local change has been handed to the store.
    pub async fn wait_saved(&self) {
        self.coalescer.wait_idle().await;
    }

    /// Runs a server-computed action, then re-fetches the document so
    /// fields derived by the server show up locally.
    ///
    /// Local changes are saved before the action starts and again before the
    /// re-fetch, so no older local snapshot can overwrite what the server
    /// computed. Only one such action runs at a time; a second one is
    /// refused with [`SyncError::ActionInProgress`].
    pub async fn run_server_action<F, Fut>(&self, action: &'static str, run: F) -> SyncResult<Arc<D>>
    where
        F: FnOnce(Arc<dyn DocumentStore<D>>, D::Key) -> Fut,
        Fut: Future<Output = SyncResult<()>>,
    {
        let _guard = ActionGuard::acquire(&self.action_in_progress)?;
        self.coalescer.wait_idle().await;
        debug!(kind = D::KIND, key = %self.key, action, "running server action");

        if let Err(e) = run(Arc::clone(&self.store), self.key.clone()).await {
            warn!(kind = D::KIND, key = %self.key, action, "server action failed: {e}");
            return Err(e);
        }
        self.coalescer.wait_idle().await;
        self.refetch().await
    }
}

impl<D: Document> Drop for EditorSession<D> {
    fn drop(&mut self) {
        self.document.unsubscribe(self.subscription);
    }
}
