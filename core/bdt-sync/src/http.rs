//! HTTP document store for the builder API.
//!
//! Maps each document kind onto the builder API's REST routes. Non-success
//! statuses become [`SyncError::Status`] with the response body attached.

use crate::error::{SyncError, SyncResult};
use crate::store::{CheckActions, DocumentStore};
use async_trait::async_trait;
use bdt_types::{
    Benefit, BenefitKey, Document, EligibilityCheckDetail, Entity, EntityId, ScreenerBenefits,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Configuration for the HTTP store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpStoreConfig {
    /// Base URL of the builder API (e.g. `http://localhost:8081`).
    pub base_url: String,
    /// Per-request timeout in seconds. Bounds how long a hung write can keep
    /// a document's write path busy.
    pub timeout_secs: u64,
    /// Bearer token sent with every request, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            timeout_secs: 30,
            bearer_token: None,
        }
    }
}

/// Method and path of one REST call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub path: String,
}

impl Route {
    fn new(method: Method, path: String) -> Self {
        Self { method, path }
    }
}

fn seg(id: &EntityId) -> String {
    urlencoding::encode(id.as_str()).into_owned()
}

/// A document kind served by the builder API.
pub trait RestDocument: Document {
    fn fetch_route(key: &Self::Key) -> Route;

    fn replace_route(key: &Self::Key) -> Route;

    /// Dedicated create-child endpoint. `None` makes the store fall back to
    /// a fetch-modify-replace cycle.
    fn add_child_route(key: &Self::Key) -> Option<Route>;

    /// Dedicated delete-child endpoint, see [`add_child_route`](Self::add_child_route).
    fn remove_child_route(key: &Self::Key, child_id: &EntityId) -> Option<Route>;
}

impl RestDocument for ScreenerBenefits {
    fn fetch_route(key: &EntityId) -> Route {
        Route::new(Method::GET, format!("/api/screener/{}", seg(key)))
    }

    fn replace_route(_key: &EntityId) -> Route {
        Route::new(Method::PUT, "/api/screener".to_string())
    }

    fn add_child_route(key: &EntityId) -> Option<Route> {
        Some(Route::new(Method::POST, format!("/api/screener/{}/benefit", seg(key))))
    }

    fn remove_child_route(key: &EntityId, child_id: &EntityId) -> Option<Route> {
        Some(Route::new(
            Method::DELETE,
            format!("/api/screener/{}/benefit/{}", seg(key), seg(child_id)),
        ))
    }
}

fn benefit_path(key: &BenefitKey) -> String {
    format!(
        "/api/screener/{}/benefit/{}",
        seg(&key.screener_id),
        seg(&key.benefit_id)
    )
}

impl RestDocument for Benefit {
    fn fetch_route(key: &BenefitKey) -> Route {
        Route::new(Method::GET, benefit_path(key))
    }

    fn replace_route(key: &BenefitKey) -> Route {
        Route::new(Method::PATCH, benefit_path(key))
    }

    fn add_child_route(key: &BenefitKey) -> Option<Route> {
        Some(Route::new(Method::POST, format!("{}/check", benefit_path(key))))
    }

    fn remove_child_route(key: &BenefitKey, child_id: &EntityId) -> Option<Route> {
        Some(Route::new(
            Method::DELETE,
            format!("{}/check/{}", benefit_path(key), seg(child_id)),
        ))
    }
}

impl RestDocument for EligibilityCheckDetail {
    fn fetch_route(key: &EntityId) -> Route {
        Route::new(Method::GET, format!("/api/custom-checks/{}", seg(key)))
    }

    fn replace_route(_key: &EntityId) -> Route {
        Route::new(Method::PUT, "/api/custom-checks".to_string())
    }

    fn add_child_route(_key: &EntityId) -> Option<Route> {
        None
    }

    fn remove_child_route(_key: &EntityId, _child_id: &EntityId) -> Option<Route> {
        None
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveDmnRequest<'a> {
    id: &'a str,
    dmn_model: &'a str,
}

/// Document store backed by the builder API.
pub struct HttpDocumentStore {
    config: HttpStoreConfig,
    client: Client,
}

impl HttpDocumentStore {
    /// Creates a store with its own HTTP client.
    pub fn new(config: HttpStoreConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpStoreConfig {
        &self.config
    }

    fn request(&self, route: &Route) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), route.path);
        let builder = self.client.request(route.method.clone(), url);
        match &self.config.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, route: &Route, builder: RequestBuilder) -> SyncResult<Response> {
        debug!(method = %route.method, path = %route.path, "sending request");
        let response = builder
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("{} {} failed: {e}", route.method, route.path)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_document<D: RestDocument>(&self, key: &D::Key) -> SyncResult<D> {
        let route = D::fetch_route(key);
        let response = self.send(&route, self.request(&route)).await?;
        response
            .json::<D>()
            .await
            .map_err(|e| SyncError::Protocol(format!("failed to parse {}: {e}", D::KIND)))
    }

    async fn put_document<D: RestDocument>(&self, key: &D::Key, doc: &D) -> SyncResult<()> {
        let route = D::replace_route(key);
        self.send(&route, self.request(&route).json(doc)).await?;
        Ok(())
    }
}

#[async_trait]
impl<D: RestDocument> DocumentStore<D> for HttpDocumentStore {
    fn store_name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, key: &D::Key) -> SyncResult<D> {
        self.get_document::<D>(key).await
    }

    async fn replace(&self, key: &D::Key, doc: &D) -> SyncResult<()> {
        self.put_document(key, doc).await
    }

    async fn add_child(&self, key: &D::Key, child: &D::Child) -> SyncResult<()> {
        match D::add_child_route(key) {
            Some(route) => {
                self.send(&route, self.request(&route).json(child)).await?;
                Ok(())
            }
            None => {
                let mut doc = self.get_document::<D>(key).await?;
                if doc.contains_child(child.entity_id()) {
                    return Err(SyncError::DuplicateEntity(child.entity_id().to_string()));
                }
                doc.children_mut().push(child.clone());
                self.put_document(key, &doc).await
            }
        }
    }

    async fn remove_child(&self, key: &D::Key, child_id: &EntityId) -> SyncResult<()> {
        match D::remove_child_route(key, child_id) {
            Some(route) => {
                self.send(&route, self.request(&route)).await?;
                Ok(())
            }
            None => {
                let mut doc = self.get_document::<D>(key).await?;
                doc.children_mut().retain(|c| c.entity_id() != child_id);
                self.put_document(key, &doc).await
            }
        }
    }
}

#[async_trait]
impl CheckActions for HttpDocumentStore {
    async fn save_dmn_model(&self, check_id: &EntityId, dmn_model: &str) -> SyncResult<()> {
        let route = Route::new(Method::POST, "/api/save-check-dmn".to_string());
        let body = SaveDmnRequest {
            id: check_id.as_str(),
            dmn_model,
        };
        self.send(&route, self.request(&route).json(&body)).await?;
        Ok(())
    }

    async fn publish_check(&self, check_id: &EntityId) -> SyncResult<()> {
        let route = Route::new(Method::POST, format!("/api/publish-check/{}", seg(check_id)));
        self.send(&route, self.request(&route)).await?;
        Ok(())
    }
}
