use super::session::EditorSession;
use crate::coalescer::WriteConfig;
use crate::error::SyncResult;
use crate::store::{CheckActions, CheckStore, DocumentStore};
use bdt_types::{EligibilityCheckDetail, EntityId, ParameterDefinition};
use std::ops::Deref;
use std::sync::Arc;

/// Edits a custom eligibility check's parameter definitions and decision
/// model.
pub struct EligibilityCheckEditor {
    session: EditorSession<EligibilityCheckDetail>,
    actions: Arc<dyn CheckActions>,
}

impl EligibilityCheckEditor {
    pub fn new<S>(check_id: impl Into<EntityId>, store: Arc<S>, config: WriteConfig) -> SyncResult<Self>
    where
        S: CheckStore + 'static,
    {
        let documents: Arc<dyn DocumentStore<EligibilityCheckDetail>> = store.clone();
        let actions: Arc<dyn CheckActions> = store;
        Ok(Self {
            session: EditorSession::new(check_id.into(), documents, config)?,
            actions,
        })
    }

    pub fn session(&self) -> &EditorSession<EligibilityCheckDetail> {
        &self.session
    }

    // ── Client-computed actions ──────────────────────────────────

    pub fn add_parameter(&self, parameter: ParameterDefinition) -> SyncResult<Arc<EligibilityCheckDetail>> {
        self.session.document().insert_entity(parameter, None)
    }

    /// Replaces the definition of parameter `key`. The replacement may carry
    /// a new key, as long as it is not taken and was not removed earlier in
    /// this session.
    pub fn update_parameter(
        &self,
        key: &EntityId,
        parameter: ParameterDefinition,
    ) -> SyncResult<Arc<EligibilityCheckDetail>> {
        self.session
            .document()
            .update_entity(key, |current| *current = parameter)
    }

    pub fn remove_parameter(&self, key: &EntityId) -> Arc<EligibilityCheckDetail> {
        self.session.document().remove_entity(key)
    }

    pub fn move_parameter(&self, key: &EntityId, to_index: usize) -> Arc<EligibilityCheckDetail> {
        self.session.document().move_entity(key, to_index)
    }

    // ── Server-computed actions ──────────────────────────────────

    /// Saves a new decision model, then reloads the check to pick up the
    /// inputs the server derives from it.
    pub async fn save_dmn_model(&self, dmn_model: impl Into<String>) -> SyncResult<Arc<EligibilityCheckDetail>> {
        let dmn_model = dmn_model.into();
        let actions = Arc::clone(&self.actions);
        self.session
            .run_server_action("save_dmn_model", move |_, key| async move {
                actions.save_dmn_model(&key, &dmn_model).await
            })
            .await
    }

    /// Publishes the check, then reloads it to pick up the new version.
    pub async fn publish(&self) -> SyncResult<Arc<EligibilityCheckDetail>> {
        let actions = Arc::clone(&self.actions);
        self.session
            .run_server_action("publish_check", move |_, key| async move {
                actions.publish_check(&key).await
            })
            .await
    }
}

impl Deref for EligibilityCheckEditor {
    type Target = EditorSession<EligibilityCheckDetail>;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}
