//! Paths into a document's JSON tree.
//!
//! A path is a sequence of object keys, array indices and entity selectors.
//! Entity selectors pick the array element whose id field matches, so a path
//! keeps pointing at the same entity when siblings are added, removed or
//! reordered.

use bdt_types::{Entity, EntityId};
use serde_json::Value;
use std::fmt;

/// One step of a [`DocPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object member.
    Key(String),
    /// Array element by position.
    Index(usize),
    /// Array element whose `field` equals `id`.
    Entity { field: String, id: String },
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "/{key}"),
            Self::Index(index) => write!(f, "/{index}"),
            Self::Entity { field, id } => write!(f, "/[{field}={id}]"),
        }
    }
}

/// Location of a value inside a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocPath(Vec<PathSegment>);

impl DocPath {
    /// The path to the document itself.
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(PathSegment::Key(key.into()));
        self
    }

    #[must_use]
    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathSegment::Index(index));
        self
    }

    /// Selects the element of type `E` with the given id.
    #[must_use]
    pub fn entity<E: Entity>(mut self, id: &EntityId) -> Self {
        self.0.push(PathSegment::Entity {
            field: E::ID_FIELD.to_string(),
            id: id.to_string(),
        });
        self
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Walks the path, returning `None` as soon as a step does not exist.
    pub fn resolve_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = root;
        for segment in &self.0 {
            current = match segment {
                PathSegment::Key(key) => current.as_object_mut()?.get_mut(key)?,
                PathSegment::Index(index) => current.as_array_mut()?.get_mut(*index)?,
                PathSegment::Entity { field, id } => current
                    .as_array_mut()?
                    .iter_mut()
                    .find(|item| item.get(field).and_then(Value::as_str) == Some(id.as_str()))?,
            };
        }
        Some(current)
    }

    /// Read-only variant of [`resolve_mut`](Self::resolve_mut).
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.0 {
            current = match segment {
                PathSegment::Key(key) => current.get(key)?,
                PathSegment::Index(index) => current.get(*index)?,
                PathSegment::Entity { field, id } => current
                    .as_array()?
                    .iter()
                    .find(|item| item.get(field).and_then(Value::as_str) == Some(id.as_str()))?,
            };
        }
        Some(current)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<Vec<PathSegment>> for DocPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}
