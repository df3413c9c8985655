//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network error (connection refused, timeout, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The server's response could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document not found in the store.
    #[error("document not found: {0}")]
    NotFound(String),

    /// `refetch` was called before any `load`.
    #[error("no document has been loaded yet")]
    NotLoaded,

    /// A newer load started before this one finished.
    #[error("load superseded by a newer request")]
    Superseded,

    /// An entity with this id is already present.
    #[error("duplicate entity id: {0}")]
    DuplicateEntity(String),

    /// The id belonged to an entity removed earlier in this session.
    #[error("entity id was removed earlier and cannot be reused: {0}")]
    EntityIdReused(String),

    /// A mutation produced a value that is not a valid document.
    #[error("invalid mutation at {path}: {reason}")]
    InvalidMutation { path: String, reason: String },

    /// Another server-side action is still running.
    #[error("another action is already in progress")]
    ActionInProgress,

    /// No tokio runtime was available to run writes on.
    #[error("no async runtime available: {0}")]
    Runtime(String),
}

impl SyncError {
    /// Returns the HTTP status for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
