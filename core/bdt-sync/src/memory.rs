//! In-memory document store.
//!
//! Backs the development server and tests. Documents are kept per key and
//! every operation has the same whole-document semantics as the HTTP API.

use crate::error::{SyncError, SyncResult};
use crate::store::{CheckActions, DocumentStore};
use async_trait::async_trait;
use bdt_types::{Document, EligibilityCheckDetail, Entity, EntityId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// A [`DocumentStore`] holding documents in a map.
pub struct MemoryDocumentStore<D: Document> {
    docs: RwLock<HashMap<D::Key, D>>,
    replace_count: AtomicU64,
}

impl<D: Document> Default for MemoryDocumentStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Document> MemoryDocumentStore<D> {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            replace_count: AtomicU64::new(0),
        }
    }

    /// Stores `doc` under `key`, returning the previous document.
    pub async fn insert(&self, key: D::Key, doc: D) -> Option<D> {
        self.docs.write().await.insert(key, doc)
    }

    /// Removes the document stored under `key`.
    pub async fn remove(&self, key: &D::Key) -> Option<D> {
        self.docs.write().await.remove(key)
    }

    pub async fn get(&self, key: &D::Key) -> Option<D> {
        self.docs.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    /// Number of `replace` calls served so far.
    pub fn replace_count(&self) -> u64 {
        self.replace_count.load(Ordering::Relaxed)
    }

    /// Applies `edit` to the document under `key`.
    pub async fn modify<F, R>(&self, key: &D::Key, edit: F) -> SyncResult<R>
    where
        F: FnOnce(&mut D) -> SyncResult<R> + Send,
    {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(key)
            .ok_or_else(|| SyncError::NotFound(format!("{} {key}", D::KIND)))?;
        edit(doc)
    }
}

#[async_trait]
impl<D: Document> DocumentStore<D> for MemoryDocumentStore<D> {
    fn store_name(&self) -> &'static str {
        "memory"
    }

    async fn fetch(&self, key: &D::Key) -> SyncResult<D> {
        self.get(key)
            .await
            .ok_or_else(|| SyncError::NotFound(format!("{} {key}", D::KIND)))
    }

    async fn replace(&self, key: &D::Key, doc: &D) -> SyncResult<()> {
        self.replace_count.fetch_add(1, Ordering::Relaxed);
        self.docs.write().await.insert(key.clone(), doc.clone());
        debug!(kind = D::KIND, %key, "stored document");
        Ok(())
    }

    async fn add_child(&self, key: &D::Key, child: &D::Child) -> SyncResult<()> {
        let child = child.clone();
        self.modify(key, move |doc| {
            if doc.contains_child(child.entity_id()) {
                return Err(SyncError::DuplicateEntity(child.entity_id().to_string()));
            }
            doc.children_mut().push(child);
            Ok(())
        })
        .await
    }

    async fn remove_child(&self, key: &D::Key, child_id: &EntityId) -> SyncResult<()> {
        self.modify(key, |doc| {
            let children = doc.children_mut();
            let before = children.len();
            children.retain(|c| c.entity_id() != child_id);
            if children.len() == before {
                return Err(SyncError::NotFound(format!("child {child_id}")));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl CheckActions for MemoryDocumentStore<EligibilityCheckDetail> {
    async fn save_dmn_model(&self, check_id: &EntityId, dmn_model: &str) -> SyncResult<()> {
        let dmn_model = dmn_model.to_string();
        self.modify(check_id, move |check| {
            check.dmn_model = dmn_model;
            Ok(())
        })
        .await
    }

    async fn publish_check(&self, check_id: &EntityId) -> SyncResult<()> {
        self.modify(check_id, |check| {
            check.version += 1;
            Ok(())
        })
        .await
    }
}
