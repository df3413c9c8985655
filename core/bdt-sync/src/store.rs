//! Remote document store abstraction.
//!
//! Defines the persistence operations the synchronizer consumes, so the
//! editors work the same against the HTTP API and the in-memory store.

use crate::error::SyncResult;
use async_trait::async_trait;
use bdt_types::{Document, EligibilityCheckDetail, EntityId};

/// Fetch and replace whole documents, plus the server-computed child
/// operations.
#[async_trait]
pub trait DocumentStore<D: Document>: Send + Sync {
    /// Name of the backing store, used in logs.
    fn store_name(&self) -> &'static str;

    /// Fetches the document stored under `key`.
    async fn fetch(&self, key: &D::Key) -> SyncResult<D>;

    /// Replaces the stored document with `doc`.
    ///
    /// Must be an idempotent full replace: the write coalescer skips
    /// intermediate states and relies on the last write winning.
    async fn replace(&self, key: &D::Key, doc: &D) -> SyncResult<()>;

    /// Creates a child entity on the server, which may fill in derived
    /// fields. Callers re-fetch afterwards.
    async fn add_child(&self, key: &D::Key, child: &D::Child) -> SyncResult<()>;

    /// Removes a child entity on the server. Callers re-fetch afterwards.
    async fn remove_child(&self, key: &D::Key, child_id: &EntityId) -> SyncResult<()>;
}

/// Server-side operations on custom eligibility checks.
#[async_trait]
pub trait CheckActions: Send + Sync {
    /// Stores a new decision model for the check.
    async fn save_dmn_model(&self, check_id: &EntityId, dmn_model: &str) -> SyncResult<()>;

    /// Publishes the check's working version.
    async fn publish_check(&self, check_id: &EntityId) -> SyncResult<()>;
}

/// A store that serves eligibility checks, including their server-side
/// actions.
pub trait CheckStore: DocumentStore<EligibilityCheckDetail> + CheckActions {}

impl<T> CheckStore for T where T: DocumentStore<EligibilityCheckDetail> + CheckActions {}
