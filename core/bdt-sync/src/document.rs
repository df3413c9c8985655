//! Local reactive document.
//!
//! Holds the current, editable state of one document and tells subscribers
//! about every change. A logical edit is always observed as exactly one
//! change event carrying the new full snapshot, however deep inside the tree
//! the edit happened.

use crate::error::{SyncError, SyncResult};
use crate::path::DocPath;
use bdt_types::{Document, Entity, EntityId};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Where a change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// An edit made through the document's mutation API.
    Local,
    /// The document was replaced by a fetched copy.
    Remote,
}

/// Notification fired after every mutation.
#[derive(Debug, Clone)]
pub struct DocumentChange<D> {
    /// The full document after the change.
    pub snapshot: Arc<D>,
    pub origin: ChangeOrigin,
    /// Monotonic counter, bumped only when the content actually changed.
    pub revision: u64,
    /// `false` when the mutation addressed a path that no longer exists.
    pub changed: bool,
}

/// Handle returned by [`LocalDocument::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<D> = Arc<dyn Fn(&DocumentChange<D>) + Send + Sync>;

struct DocumentState<D> {
    current: Arc<D>,
    revision: u64,
    /// Ids of children removed during this session; never handed out again.
    removed_ids: HashSet<EntityId>,
}

impl<D: Document> DocumentState<D> {
    /// Refuses a local edit that duplicates a child id or brings back one
    /// removed earlier in this session.
    fn check_ids(&self, next: &D) -> SyncResult<()> {
        let mut before: HashMap<&EntityId, usize> = HashMap::new();
        for child in self.current.children() {
            *before.entry(child.entity_id()).or_default() += 1;
        }
        let mut after: HashMap<&EntityId, usize> = HashMap::new();
        for child in next.children() {
            *after.entry(child.entity_id()).or_default() += 1;
        }
        for (id, count) in after {
            let existing = before.get(id).copied().unwrap_or(0);
            if existing == 0 && self.removed_ids.contains(id) {
                return Err(SyncError::EntityIdReused(id.to_string()));
            }
            if count > existing.max(1) {
                return Err(SyncError::DuplicateEntity(id.to_string()));
            }
        }
        Ok(())
    }

    /// Applies a local edit, recording the ids it removed.
    fn commit_local(&mut self, next: D) -> SyncResult<DocumentChange<D>> {
        self.check_ids(&next)?;
        let removed: Vec<EntityId> = {
            let kept: HashSet<&EntityId> = next.children().iter().map(|c| c.entity_id()).collect();
            self.current
                .children()
                .iter()
                .map(|c| c.entity_id())
                .filter(|id| !kept.contains(id))
                .cloned()
                .collect()
        };
        self.removed_ids.extend(removed);
        Ok(self.commit(next, ChangeOrigin::Local))
    }

    fn commit(&mut self, next: D, origin: ChangeOrigin) -> DocumentChange<D> {
        self.current = Arc::new(next);
        self.revision += 1;
        DocumentChange {
            snapshot: Arc::clone(&self.current),
            origin,
            revision: self.revision,
            changed: true,
        }
    }

    fn unchanged(&self) -> DocumentChange<D> {
        DocumentChange {
            snapshot: Arc::clone(&self.current),
            origin: ChangeOrigin::Local,
            revision: self.revision,
            changed: false,
        }
    }
}

/// In-memory mirror of a remote document.
pub struct LocalDocument<D: Document> {
    state: Mutex<DocumentState<D>>,
    listeners: Mutex<Vec<(SubscriptionId, Listener<D>)>>,
    next_subscription: AtomicU64,
}

impl<D: Document> Default for LocalDocument<D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}

impl<D: Document> LocalDocument<D> {
    /// Creates a document holding `initial`.
    pub fn new(initial: D) -> Self {
        Self {
            state: Mutex::new(DocumentState {
                current: Arc::new(initial),
                revision: 0,
                removed_ids: HashSet::new(),
            }),
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DocumentState<D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Listener<D>)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current snapshot.
    pub fn get(&self) -> Arc<D> {
        Arc::clone(&self.lock_state().current)
    }

    /// Returns the number of content changes applied so far.
    pub fn revision(&self) -> u64 {
        self.lock_state().revision
    }

    /// Returns whether `id` belonged to a child removed in this session.
    pub fn was_removed(&self, id: &EntityId) -> bool {
        self.lock_state().removed_ids.contains(id)
    }

    /// Registers a listener called synchronously after every change.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&DocumentChange<D>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.lock_listeners().push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    /// Runs the listeners outside of both locks so they may read the
    /// document or mutate it again.
    fn notify(&self, change: &DocumentChange<D>) {
        let listeners: Vec<Listener<D>> = self
            .lock_listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(change);
        }
    }

    /// Applies `updater` to the value at `path` and returns the new snapshot.
    ///
    /// A path that no longer exists leaves the document untouched, but the
    /// change notification still fires with the unchanged snapshot. An
    /// updater that leaves the tree in a shape the document type cannot
    /// represent, or that duplicates or reuses a child id, is rejected and
    /// nothing is notified.
    pub fn mutate<F>(&self, path: &DocPath, updater: F) -> SyncResult<Arc<D>>
    where
        F: FnOnce(&mut Value),
    {
        let change = {
            let mut state = self.lock_state();
            let mut tree = serde_json::to_value(state.current.as_ref())?;
            match path.resolve_mut(&mut tree) {
                Some(target) => {
                    updater(target);
                    let next: D =
                        serde_json::from_value(tree).map_err(|e| SyncError::InvalidMutation {
                            path: path.to_string(),
                            reason: e.to_string(),
                        })?;
                    state.commit_local(next)?
                }
                None => {
                    debug!(kind = D::KIND, %path, "mutation addressed a missing path");
                    state.unchanged()
                }
            }
        };
        self.notify(&change);
        Ok(change.snapshot)
    }

    /// Applies a typed edit to a copy of the document and publishes it.
    pub fn update<F>(&self, edit: F) -> SyncResult<Arc<D>>
    where
        F: FnOnce(&mut D),
    {
        let change = {
            let mut state = self.lock_state();
            let mut next = D::clone(&state.current);
            edit(&mut next);
            state.commit_local(next)?
        };
        self.notify(&change);
        Ok(change.snapshot)
    }

    /// Edits one child in place. A missing child is a no-op that still
    /// notifies. An edit that changes the child's id to one that is present
    /// or was removed earlier is refused.
    pub fn update_entity<F>(&self, id: &EntityId, edit: F) -> SyncResult<Arc<D>>
    where
        F: FnOnce(&mut D::Child),
    {
        let change = {
            let mut state = self.lock_state();
            match state.current.children().iter().position(|c| c.entity_id() == id) {
                Some(index) => {
                    let mut next = D::clone(&state.current);
                    edit(&mut next.children_mut()[index]);
                    state.commit_local(next)?
                }
                None => {
                    debug!(kind = D::KIND, %id, "update addressed a missing entity");
                    state.unchanged()
                }
            }
        };
        self.notify(&change);
        Ok(change.snapshot)
    }

    /// Inserts a new child at `index` (appended when `None` or past the end).
    ///
    /// Ids are never reused: an id that is present, or that belonged to a
    /// child removed earlier in this session, is refused.
    pub fn insert_entity(&self, child: D::Child, index: Option<usize>) -> SyncResult<Arc<D>> {
        let change = {
            let mut state = self.lock_state();
            let mut next = D::clone(&state.current);
            let children = next.children_mut();
            let at = index.map_or(children.len(), |i| i.min(children.len()));
            children.insert(at, child);
            state.commit_local(next)?
        };
        self.notify(&change);
        Ok(change.snapshot)
    }

    /// Removes a child. A missing child is a no-op that still notifies.
    pub fn remove_entity(&self, id: &EntityId) -> Arc<D> {
        let change = {
            let mut state = self.lock_state();
            if state.current.contains_child(id) {
                let mut next = D::clone(&state.current);
                next.children_mut().retain(|c| c.entity_id() != id);
                state.removed_ids.insert(id.clone());
                state.commit(next, ChangeOrigin::Local)
            } else {
                debug!(kind = D::KIND, %id, "remove addressed a missing entity");
                state.unchanged()
            }
        };
        self.notify(&change);
        change.snapshot
    }

    /// Moves a child to `to_index` (clamped to the last position).
    pub fn move_entity(&self, id: &EntityId, to_index: usize) -> Arc<D> {
        let change = {
            let mut state = self.lock_state();
            match state.current.children().iter().position(|c| c.entity_id() == id) {
                Some(from) => {
                    let mut next = D::clone(&state.current);
                    let children = next.children_mut();
                    let child = children.remove(from);
                    let to = to_index.min(children.len());
                    children.insert(to, child);
                    state.commit(next, ChangeOrigin::Local)
                }
                None => state.unchanged(),
            }
        };
        self.notify(&change);
        change.snapshot
    }

    /// Records that the server removed child `id`, so it is never handed out
    /// again in this session.
    pub fn mark_removed(&self, id: &EntityId) {
        self.lock_state().removed_ids.insert(id.clone());
    }

    /// Replaces the whole document with a fetched copy.
    pub fn replace_from_remote(&self, doc: D) -> Arc<D> {
        let change = self.lock_state().commit(doc, ChangeOrigin::Remote);
        self.notify(&change);
        change.snapshot
    }
}
