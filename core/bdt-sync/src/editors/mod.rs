//! Per-document editors.
//!
//! Each editor owns one [`EditorSession`] and exposes the actions its
//! screen offers. Client-computed actions edit the local document and
//! return immediately; the coalescer persists them in the background.
//! Server-computed actions call the store and re-fetch the document.

mod benefit;
mod check;
mod screener;
mod session;

pub use benefit::BenefitEditor;
pub use check::EligibilityCheckEditor;
pub use screener::ScreenerBenefitsEditor;
pub use session::EditorSession;
