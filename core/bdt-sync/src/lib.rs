//! Optimistic document synchronizer for the benefit decision toolkit.
//!
//! Keeps an in-memory copy of a nested document (a screener's benefit
//! list, a benefit, or an eligibility check) in step with the builder API.
//!
//! # Architecture
//!
//! - **Document**: the local copy. Edits apply synchronously and notify
//!   subscribers with the new snapshot.
//! - **Coalescer**: persists local snapshots with at most one write in
//!   flight per document. Snapshots produced while a write is in flight
//!   collapse into a single pending slot, so only the newest one is sent.
//! - **Loader**: fetches documents, tracks loading and error state, and
//!   discards results of loads that were superseded.
//! - **Store**: the persistence seam, implemented over HTTP and in memory.
//! - **Editors**: the actions offered by each editing screen.
//!
//! # Example
//!
//! ```no_run
//! use bdt_sync::{HttpDocumentStore, HttpStoreConfig, ScreenerBenefitsEditor, WriteConfig};
//! use bdt_types::BenefitDetail;
//! use std::sync::Arc;
//!
//! # async fn run() -> bdt_sync::SyncResult<()> {
//! let store = Arc::new(HttpDocumentStore::new(HttpStoreConfig::default())?);
//! let editor = ScreenerBenefitsEditor::new("screener-1", store, WriteConfig::default())?;
//! editor.load().await?;
//! editor.add_benefit(BenefitDetail::new("Senior tax credit", ""))?;
//! editor.wait_saved().await;
//! # Ok(())
//! # }
//! ```

mod coalescer;
mod document;
pub mod editors;
mod error;
pub mod http;
mod loader;
pub mod memory;
pub mod path;
mod store;

pub use coalescer::{SaveStatus, WriteCoalescer, WriteConfig};
pub use document::{ChangeOrigin, DocumentChange, LocalDocument, SubscriptionId};
pub use editors::{BenefitEditor, EditorSession, EligibilityCheckEditor, ScreenerBenefitsEditor};
pub use error::{SyncError, SyncResult};
pub use http::{HttpDocumentStore, HttpStoreConfig, RestDocument, Route};
pub use loader::{LoadController, LoadState, LoadStatus};
pub use memory::MemoryDocumentStore;
pub use path::{DocPath, PathSegment};
pub use store::{CheckActions, CheckStore, DocumentStore};
