use crate::EntityId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::hash::Hash;

/// A named object nested inside a document (benefit, check configuration,
/// parameter definition).
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// JSON field that carries the entity's identifier.
    const ID_FIELD: &'static str;

    /// Returns the entity's identifier.
    fn entity_id(&self) -> &EntityId;
}

/// The unit of synchronization.
///
/// A document is fetched and replaced as a whole and owns one ordered
/// collection of child entities. The default value is the placeholder shown
/// before the first successful load.
pub trait Document: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Identifier used to fetch and replace the document.
    type Key: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static;

    /// The entity type held in the document's child collection.
    type Child: Entity;

    /// Human-readable document kind, used in logs.
    const KIND: &'static str;

    /// JSON field that holds the child collection.
    const CHILDREN_FIELD: &'static str;

    fn children(&self) -> &[Self::Child];

    fn children_mut(&mut self) -> &mut Vec<Self::Child>;

    /// Returns the child with the given id, if present.
    fn child(&self, id: &EntityId) -> Option<&Self::Child> {
        self.children().iter().find(|c| c.entity_id() == id)
    }

    /// Returns whether a child with the given id is present.
    fn contains_child(&self, id: &EntityId) -> bool {
        self.child(id).is_some()
    }
}
