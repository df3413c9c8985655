//! Core type definitions for the benefit decision toolkit.
//!
//! This crate defines the domain types that the document synchronizer keeps
//! in step with the builder API:
//! - Entity identifiers and document keys
//! - Typed parameter values
//! - The three synchronized documents: a screener's benefit list, a single
//!   benefit with its check configurations, and an eligibility check with its
//!   parameter definitions
//!
//! Every document and entity keeps the JSON fields it does not model in a
//! flattened `extra` map, so a full-document write never drops data the
//! server sent.

mod benefit;
mod check;
mod document;
mod ids;
mod nullable;
mod parameter;

pub use benefit::{Benefit, BenefitDetail, BenefitPatch, CheckConfig, ScreenerBenefits};
pub use check::{EligibilityCheckDetail, InputDefinition, ParameterDefinition};
pub use document::{Document, Entity};
pub use ids::{BenefitKey, EntityId};
pub use parameter::{ParameterType, ParameterValue, ParameterValues};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid date: {0}")]
    InvalidDate(#[from] chrono::ParseError),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("invalid boolean: {0}")]
    InvalidBoolean(String),

    #[error("value of type {actual} does not match declared type {expected}")]
    TypeMismatch {
        expected: ParameterType,
        actual: &'static str,
    },
}
