//! Custom eligibility checks and their parameter definitions.

use crate::{Document, Entity, EntityId, ParameterType};
use crate::nullable::or_default;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declares one parameter a check accepts from the benefits that use it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    pub key: EntityId,
    #[serde(default, deserialize_with = "or_default")]
    pub label: String,
    #[serde(default, deserialize_with = "or_default")]
    pub required: bool,
    #[serde(rename = "type")]
    pub parameter_type: ParameterType,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ParameterDefinition {
    pub fn new(key: impl Into<EntityId>, label: impl Into<String>, ty: ParameterType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            required: false,
            parameter_type: ty,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the values offered by a select parameter.
    #[must_use]
    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.extra.insert("options".to_string(), Value::String(options.into()));
        self
    }

    /// Values offered by a select parameter.
    pub fn options(&self) -> Option<&str> {
        self.extra.get("options").and_then(Value::as_str)
    }
}

impl Entity for ParameterDefinition {
    const ID_FIELD: &'static str = "key";

    fn entity_id(&self) -> &EntityId {
        &self.key
    }
}

/// An input a check reads from the screener's form data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDefinition {
    pub key: String,
    #[serde(default, deserialize_with = "or_default")]
    pub prompt: String,
    #[serde(rename = "type", default, deserialize_with = "or_default")]
    pub input_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InputDefinition {
    /// Values offered by a select input.
    pub fn options(&self) -> Option<&str> {
        self.extra.get("options").and_then(Value::as_str)
    }
}

/// A custom eligibility check, including its decision model source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityCheckDetail {
    #[serde(default, deserialize_with = "or_default")]
    pub id: EntityId,
    #[serde(default, deserialize_with = "or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "or_default")]
    pub module: String,
    #[serde(default, deserialize_with = "or_default")]
    pub version: i64,
    #[serde(default, deserialize_with = "or_default")]
    pub description: String,
    #[serde(default, deserialize_with = "or_default")]
    pub inputs: Vec<InputDefinition>,
    #[serde(default, deserialize_with = "or_default")]
    pub parameters: Vec<ParameterDefinition>,
    #[serde(default, deserialize_with = "or_default")]
    pub dmn_model: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EligibilityCheckDetail {
    /// API endpoint of the published check, if any.
    pub fn path(&self) -> Option<&str> {
        self.extra.get("path").and_then(Value::as_str)
    }

    /// Returns the definition of the given parameter, if present.
    pub fn parameter(&self, key: &EntityId) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| &p.key == key)
    }
}

impl Document for EligibilityCheckDetail {
    type Key = EntityId;
    type Child = ParameterDefinition;

    const KIND: &'static str = "check";
    const CHILDREN_FIELD: &'static str = "parameters";

    fn children(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    fn children_mut(&mut self) -> &mut Vec<ParameterDefinition> {
        &mut self.parameters
    }
}
