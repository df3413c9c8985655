//! In-memory builder API for local development.
//!
//! Serves the same REST routes as the builder API out of
//! [`MemoryDocumentStore`]s, including the fields the real server derives
//! (benefit documents created alongside their screener entry, check names
//! filled in on attach, version bumps on publish). An optional artificial
//! latency makes the write coalescing visible while editing.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;
use bdt_sync::{CheckActions, DocumentStore, MemoryDocumentStore, SyncError};
use bdt_types::{
    Benefit, BenefitDetail, BenefitKey, CheckConfig, Document, EligibilityCheckDetail, EntityId,
    ScreenerBenefits,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Errors returned by the API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Sync(SyncError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Sync(SyncError::DuplicateEntity(_)) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Sync(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Initial documents loaded at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedData {
    pub screeners: Vec<ScreenerBenefits>,
    pub benefits: Vec<SeededBenefit>,
    pub checks: Vec<EligibilityCheckDetail>,
}

/// A benefit document and the screener that owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeededBenefit {
    pub screener_id: EntityId,
    pub benefit: Benefit,
}

/// Document counts reported by `GET /api/v1/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub screeners: usize,
    pub benefits: usize,
    pub checks: usize,
    /// Full-document replaces served since startup.
    pub replaces: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveDmnRequest {
    id: EntityId,
    dmn_model: String,
}

/// Documents served by the dev server.
#[derive(Default)]
pub struct AppState {
    pub screeners: MemoryDocumentStore<ScreenerBenefits>,
    pub benefits: MemoryDocumentStore<Benefit>,
    pub checks: MemoryDocumentStore<EligibilityCheckDetail>,
    latency: Duration,
}

impl AppState {
    /// Creates an empty state answering every request after `latency`.
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Loads seed documents. Seeded benefits missing from their screener's
    /// list are added to it.
    pub async fn seed(&self, data: SeedData) -> SeedSummary {
        let mut count = SeedSummary::default();
        for screener in data.screeners {
            self.screeners.insert(screener.id.clone(), screener).await;
            count.screeners += 1;
        }
        for SeededBenefit { screener_id, benefit } in data.benefits {
            let detail = benefit.detail();
            let listed = self
                .screeners
                .modify(&screener_id, |screener| {
                    if !screener.contains_child(&detail.id) {
                        screener.benefits.push(detail.clone());
                    }
                    Ok(())
                })
                .await;
            if let Err(e) = listed {
                debug!(%screener_id, "seeded benefit has no screener: {e}");
            }
            self.benefits
                .insert(BenefitKey::new(screener_id, benefit.id.clone()), benefit)
                .await;
            count.benefits += 1;
        }
        for check in data.checks {
            self.checks.insert(check.id.clone(), check).await;
            count.checks += 1;
        }
        count
    }

    pub async fn status(&self) -> StatusResponse {
        StatusResponse {
            screeners: self.screeners.len().await,
            benefits: self.benefits.len().await,
            checks: self.checks.len().await,
            replaces: self.screeners.replace_count()
                + self.benefits.replace_count()
                + self.checks.replace_count(),
        }
    }
}

/// Number of documents loaded by [`AppState::seed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub screeners: usize,
    pub benefits: usize,
    pub checks: usize,
}

type SharedState = Arc<AppState>;

fn require_id(id: &EntityId, what: &str) -> ApiResult<()> {
    if id.is_empty() {
        return Err(ApiError::BadRequest(format!("{what} id is required")));
    }
    Ok(())
}

// ── Status ──────────────────────────────────────────────────────

async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    Json(state.status().await)
}

// ── Screeners ───────────────────────────────────────────────────

async fn get_screener(
    State(state): State<SharedState>,
    Path(screener_id): Path<EntityId>,
) -> ApiResult<Json<ScreenerBenefits>> {
    state.delay().await;
    Ok(Json(state.screeners.fetch(&screener_id).await?))
}

async fn put_screener(
    State(state): State<SharedState>,
    Json(screener): Json<ScreenerBenefits>,
) -> ApiResult<StatusCode> {
    state.delay().await;
    require_id(&screener.id, "screener")?;
    state.screeners.replace(&screener.id, &screener).await?;
    Ok(StatusCode::OK)
}

async fn create_benefit(
    State(state): State<SharedState>,
    Path(screener_id): Path<EntityId>,
    Json(mut detail): Json<BenefitDetail>,
) -> ApiResult<(StatusCode, Json<BenefitDetail>)> {
    state.delay().await;
    if detail.id.is_empty() {
        detail.id = EntityId::generate();
    }
    state.screeners.add_child(&screener_id, &detail).await?;

    let benefit = Benefit {
        id: detail.id.clone(),
        name: detail.name.clone(),
        description: detail.description.clone(),
        ..Default::default()
    };
    state
        .benefits
        .insert(BenefitKey::new(screener_id.clone(), detail.id.clone()), benefit)
        .await;
    info!(%screener_id, benefit_id = %detail.id, "created custom benefit");
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn delete_benefit(
    State(state): State<SharedState>,
    Path((screener_id, benefit_id)): Path<(EntityId, EntityId)>,
) -> ApiResult<StatusCode> {
    state.delay().await;
    state.screeners.remove_child(&screener_id, &benefit_id).await?;
    state
        .benefits
        .remove(&BenefitKey::new(screener_id.clone(), benefit_id.clone()))
        .await;
    info!(%screener_id, %benefit_id, "deleted custom benefit");
    Ok(StatusCode::NO_CONTENT)
}

// ── Benefits ────────────────────────────────────────────────────

async fn get_benefit(
    State(state): State<SharedState>,
    Path((screener_id, benefit_id)): Path<(EntityId, EntityId)>,
) -> ApiResult<Json<Benefit>> {
    state.delay().await;
    let key = BenefitKey::new(screener_id, benefit_id);
    Ok(Json(state.benefits.fetch(&key).await?))
}

async fn patch_benefit(
    State(state): State<SharedState>,
    Path((screener_id, benefit_id)): Path<(EntityId, EntityId)>,
    Json(mut benefit): Json<Benefit>,
) -> ApiResult<StatusCode> {
    state.delay().await;
    if benefit.id.is_empty() {
        benefit.id = benefit_id.clone();
    } else if benefit.id != benefit_id {
        return Err(ApiError::BadRequest(format!(
            "benefit id {} does not match route {benefit_id}",
            benefit.id
        )));
    }

    let key = BenefitKey::new(screener_id.clone(), benefit_id.clone());
    state.benefits.replace(&key, &benefit).await?;

    // Keep the screener's summary in step with the benefit.
    let summary = benefit.detail();
    let synced = state
        .screeners
        .modify(&screener_id, |screener| {
            if let Some(listed) = screener.benefits.iter_mut().find(|b| b.id == summary.id) {
                listed.name = summary.name.clone();
                listed.description = summary.description.clone();
            }
            Ok(())
        })
        .await;
    if let Err(e) = synced {
        debug!(%key, "benefit summary not synced: {e}");
    }
    Ok(StatusCode::OK)
}

async fn attach_check(
    State(state): State<SharedState>,
    Path((screener_id, benefit_id)): Path<(EntityId, EntityId)>,
    Json(mut config): Json<CheckConfig>,
) -> ApiResult<StatusCode> {
    state.delay().await;
    require_id(&config.check_id, "check")?;
    if config.check_name.is_empty() {
        if let Some(check) = state.checks.get(&config.check_id).await {
            config.check_name = check.name;
        }
    }
    let key = BenefitKey::new(screener_id, benefit_id);
    state.benefits.add_child(&key, &config).await?;
    info!(%key, check_id = %config.check_id, "attached check");
    Ok(StatusCode::CREATED)
}

async fn detach_check(
    State(state): State<SharedState>,
    Path((screener_id, benefit_id, check_id)): Path<(EntityId, EntityId, EntityId)>,
) -> ApiResult<StatusCode> {
    state.delay().await;
    let key = BenefitKey::new(screener_id, benefit_id);
    state.benefits.remove_child(&key, &check_id).await?;
    info!(%key, %check_id, "detached check");
    Ok(StatusCode::NO_CONTENT)
}

// ── Custom checks ───────────────────────────────────────────────

async fn get_check(
    State(state): State<SharedState>,
    Path(check_id): Path<EntityId>,
) -> ApiResult<Json<EligibilityCheckDetail>> {
    state.delay().await;
    Ok(Json(state.checks.fetch(&check_id).await?))
}

async fn put_check(
    State(state): State<SharedState>,
    Json(check): Json<EligibilityCheckDetail>,
) -> ApiResult<StatusCode> {
    state.delay().await;
    require_id(&check.id, "check")?;
    state.checks.replace(&check.id, &check).await?;
    Ok(StatusCode::OK)
}

async fn save_check_dmn(
    State(state): State<SharedState>,
    Json(request): Json<SaveDmnRequest>,
) -> ApiResult<StatusCode> {
    state.delay().await;
    state.checks.save_dmn_model(&request.id, &request.dmn_model).await?;
    info!(check_id = %request.id, "saved decision model");
    Ok(StatusCode::OK)
}

async fn publish_check(
    State(state): State<SharedState>,
    Path(check_id): Path<EntityId>,
) -> ApiResult<StatusCode> {
    state.delay().await;
    state.checks.publish_check(&check_id).await?;
    info!(%check_id, "published check");
    Ok(StatusCode::OK)
}

/// Build the HTTP API router over the given state.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status_handler))
        .route("/api/screener", put(put_screener))
        .route("/api/screener/{screener_id}", get(get_screener))
        .route("/api/screener/{screener_id}/benefit", post(create_benefit))
        .route(
            "/api/screener/{screener_id}/benefit/{benefit_id}",
            get(get_benefit).patch(patch_benefit).delete(delete_benefit),
        )
        .route(
            "/api/screener/{screener_id}/benefit/{benefit_id}/check",
            post(attach_check),
        )
        .route(
            "/api/screener/{screener_id}/benefit/{benefit_id}/check/{check_id}",
            delete(detach_check),
        )
        .route("/api/custom-checks", put(put_check))
        .route("/api/custom-checks/{check_id}", get(get_check))
        .route("/api/save-check-dmn", post(save_check_dmn))
        .route("/api/publish-check/{check_id}", post(publish_check))
        .with_state(state)
}
