use super::session::EditorSession;
use crate::coalescer::WriteConfig;
use crate::error::SyncResult;
use crate::path::DocPath;
use crate::store::DocumentStore;
use bdt_types::{Benefit, BenefitKey, CheckConfig, EntityId, ParameterValue, ParameterValues};
use serde_json::Value;
use std::ops::Deref;
use std::sync::Arc;

/// Edits one benefit and the configuration of its eligibility checks.
pub struct BenefitEditor {
    session: EditorSession<Benefit>,
}

impl BenefitEditor {
    pub fn new(key: BenefitKey, store: Arc<dyn DocumentStore<Benefit>>, config: WriteConfig) -> SyncResult<Self> {
        Ok(Self {
            session: EditorSession::new(key, store, config)?,
        })
    }

    pub fn session(&self) -> &EditorSession<Benefit> {
        &self.session
    }

    /// Path to a check configuration inside the benefit.
    pub fn check_path(check_id: &EntityId) -> DocPath {
        DocPath::root().key("checks").entity::<CheckConfig>(check_id)
    }

    // ── Client-computed actions ──────────────────────────────────

    pub fn add_check(&self, check: CheckConfig) -> SyncResult<Arc<Benefit>> {
        self.session.document().insert_entity(check, None)
    }

    pub fn remove_check(&self, check_id: &EntityId) -> Arc<Benefit> {
        self.session.document().remove_entity(check_id)
    }

    /// Replaces all parameter values of one check.
    pub fn update_check_parameters(&self, check_id: &EntityId, parameters: ParameterValues) -> SyncResult<Arc<Benefit>> {
        self.session
            .document()
            .update_entity(check_id, |check| check.parameters = parameters)
    }

    /// Sets a single parameter value of one check, leaving the others as
    /// they are.
    pub fn set_parameter_value(
        &self,
        check_id: &EntityId,
        key: impl Into<String>,
        value: ParameterValue,
    ) -> SyncResult<Arc<Benefit>> {
        let key = key.into();
        self.session.document().update_entity(check_id, |check| {
            check.parameters.insert(key, value);
        })
    }

    pub fn clear_parameter_value(&self, check_id: &EntityId, key: &str) -> SyncResult<Arc<Benefit>> {
        self.session.document().update_entity(check_id, |check| {
            check.parameters.remove(key);
        })
    }

    /// Sets a field of one check configuration by name, including fields
    /// this client does not model.
    pub fn set_check_field(&self, check_id: &EntityId, field: &str, value: Value) -> SyncResult<Arc<Benefit>> {
        let field = field.to_string();
        self.session
            .document()
            .mutate(&Self::check_path(check_id), move |check| {
                if let Some(object) = check.as_object_mut() {
                    object.insert(field, value);
                }
            })
    }

    pub fn update_details(&self, name: Option<String>, description: Option<String>) -> SyncResult<Arc<Benefit>> {
        self.session.document().update(|benefit| {
            if let Some(name) = name {
                benefit.name = name;
            }
            if let Some(description) = description {
                benefit.description = description;
            }
        })
    }

    // ── Server-computed actions ──────────────────────────────────

    /// Attaches a check through the server, which fills in its name and
    /// default parameters, then reloads the benefit.
    pub async fn attach_check(&self, check: CheckConfig) -> SyncResult<Arc<Benefit>> {
        self.session
            .run_server_action("attach_check", move |store, key| async move {
                store.add_child(&key, &check).await
            })
            .await
    }

    /// Detaches a check through the server, then reloads the benefit.
    pub async fn detach_check(&self, check_id: &EntityId) -> SyncResult<Arc<Benefit>> {
        let check_id = check_id.clone();
        let document = Arc::clone(self.session.document());
        self.session
            .run_server_action("detach_check", move |store, key| async move {
                let removed = store.remove_child(&key, &check_id).await;
                if removed.is_ok() {
                    document.mark_removed(&check_id);
                }
                removed
            })
            .await
    }
}

impl Deref for BenefitEditor {
    type Target = EditorSession<Benefit>;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}
