use super::session::EditorSession;
use crate::coalescer::WriteConfig;
use crate::error::SyncResult;
use crate::store::DocumentStore;
use bdt_types::{BenefitDetail, BenefitPatch, EntityId, ScreenerBenefits};
use std::ops::Deref;
use std::sync::Arc;

/// Edits the list of benefits offered by a screener.
pub struct ScreenerBenefitsEditor {
    session: EditorSession<ScreenerBenefits>,
}

impl ScreenerBenefitsEditor {
    pub fn new(
        screener_id: impl Into<EntityId>,
        store: Arc<dyn DocumentStore<ScreenerBenefits>>,
        config: WriteConfig,
    ) -> SyncResult<Self> {
        Ok(Self {
            session: EditorSession::new(screener_id.into(), store, config)?,
        })
    }

    pub fn session(&self) -> &EditorSession<ScreenerBenefits> {
        &self.session
    }

    /// Current benefit list.
    pub fn benefits(&self) -> Vec<BenefitDetail> {
        self.session.data().benefits.clone()
    }

    // ── Client-computed actions ──────────────────────────────────

    /// Appends a benefit to the list.
    pub fn add_benefit(&self, benefit: BenefitDetail) -> SyncResult<Arc<ScreenerBenefits>> {
        self.session.document().insert_entity(benefit, None)
    }

    pub fn remove_benefit(&self, benefit_id: &EntityId) -> Arc<ScreenerBenefits> {
        self.session.document().remove_entity(benefit_id)
    }

    pub fn update_benefit(&self, benefit_id: &EntityId, patch: &BenefitPatch) -> SyncResult<Arc<ScreenerBenefits>> {
        self.session
            .document()
            .update_entity(benefit_id, |benefit| benefit.apply(patch))
    }

    /// Moves a benefit to a new position in the list.
    pub fn move_benefit(&self, benefit_id: &EntityId, to_index: usize) -> Arc<ScreenerBenefits> {
        self.session.document().move_entity(benefit_id, to_index)
    }

    pub fn rename_screener(&self, name: impl Into<String>) -> SyncResult<Arc<ScreenerBenefits>> {
        let name = name.into();
        self.session.document().update(|screener| screener.screener_name = name)
    }

    // ── Server-computed actions ──────────────────────────────────

    /// Creates a custom benefit on the server and reloads the list.
    pub async fn create_custom_benefit(&self, benefit: BenefitDetail) -> SyncResult<Arc<ScreenerBenefits>> {
        self.session
            .run_server_action("create_custom_benefit", move |store, key| async move {
                store.add_child(&key, &benefit).await
            })
            .await
    }

    /// Deletes a custom benefit on the server and reloads the list. The id
    /// is retired for the rest of the session.
    pub async fn delete_custom_benefit(&self, benefit_id: &EntityId) -> SyncResult<Arc<ScreenerBenefits>> {
        let benefit_id = benefit_id.clone();
        let document = Arc::clone(self.session.document());
        self.session
            .run_server_action("delete_custom_benefit", move |store, key| async move {
                let removed = store.remove_child(&key, &benefit_id).await;
                if removed.is_ok() {
                    document.mark_removed(&benefit_id);
                }
                removed
            })
            .await
    }
}

impl Deref for ScreenerBenefitsEditor {
    type Target = EditorSession<ScreenerBenefits>;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}
