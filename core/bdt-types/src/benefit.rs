//! Screener benefit lists and benefit configurations.

use crate::{BenefitKey, Document, Entity, EntityId, ParameterValues};
use crate::nullable::or_default;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Summary of a benefit as listed on its screener.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenefitDetail {
    pub id: EntityId,
    #[serde(default, deserialize_with = "or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "or_default")]
    pub description: String,
    #[serde(default, deserialize_with = "or_default")]
    pub is_public: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BenefitDetail {
    /// Creates a new benefit summary with a freshly generated id.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(),
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Applies the fields set in `patch`.
    pub fn apply(&mut self, patch: &BenefitPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(is_public) = patch.is_public {
            self.is_public = is_public;
        }
    }
}

impl Entity for BenefitDetail {
    const ID_FIELD: &'static str = "id";

    fn entity_id(&self) -> &EntityId {
        &self.id
    }
}

/// Partial update of a [`BenefitDetail`]. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenefitPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

/// A screener and the benefits it offers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenerBenefits {
    #[serde(default, deserialize_with = "or_default")]
    pub id: EntityId,
    #[serde(default, deserialize_with = "or_default")]
    pub screener_name: String,
    #[serde(default, deserialize_with = "or_default")]
    pub benefits: Vec<BenefitDetail>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document for ScreenerBenefits {
    type Key = EntityId;
    type Child = BenefitDetail;

    const KIND: &'static str = "screener";
    const CHILDREN_FIELD: &'static str = "benefits";

    fn children(&self) -> &[BenefitDetail] {
        &self.benefits
    }

    fn children_mut(&mut self) -> &mut Vec<BenefitDetail> {
        &mut self.benefits
    }
}

/// An eligibility check as configured by a particular benefit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckConfig {
    pub check_id: EntityId,
    #[serde(default, deserialize_with = "or_default")]
    pub check_name: String,
    #[serde(default, deserialize_with = "or_default")]
    pub parameters: ParameterValues,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CheckConfig {
    pub fn new(check_id: impl Into<EntityId>, check_name: impl Into<String>) -> Self {
        Self {
            check_id: check_id.into(),
            check_name: check_name.into(),
            ..Default::default()
        }
    }

    /// API endpoint evaluating the check (library checks only). Kept in
    /// `extra` so an absent key and an explicit `null` both survive a write.
    pub fn path(&self) -> Option<&str> {
        self.extra.get("path").and_then(Value::as_str)
    }
}

impl Entity for CheckConfig {
    const ID_FIELD: &'static str = "checkId";

    fn entity_id(&self) -> &EntityId {
        &self.check_id
    }
}

/// A benefit and the checks that decide eligibility for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Benefit {
    #[serde(default, deserialize_with = "or_default")]
    pub id: EntityId,
    #[serde(default, deserialize_with = "or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "or_default")]
    pub description: String,
    #[serde(default, deserialize_with = "or_default")]
    pub checks: Vec<CheckConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Benefit {
    /// Returns the configuration of the given check, if present.
    pub fn check(&self, check_id: &EntityId) -> Option<&CheckConfig> {
        self.checks.iter().find(|c| &c.check_id == check_id)
    }

    /// Builds the summary listed on the owning screener.
    pub fn detail(&self) -> BenefitDetail {
        BenefitDetail {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            ..Default::default()
        }
    }
}

impl Document for Benefit {
    type Key = BenefitKey;
    type Child = CheckConfig;

    const KIND: &'static str = "benefit";
    const CHILDREN_FIELD: &'static str = "checks";

    fn children(&self) -> &[CheckConfig] {
        &self.checks
    }

    fn children_mut(&mut self) -> &mut Vec<CheckConfig> {
        &mut self.checks
    }
}
