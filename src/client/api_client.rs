//! HTTP client for the marketplace API.

use std::env;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::error::{ClientError, ClientResult};
use super::identity::IdentityProvider;
use crate::api::ApiResponse;
use crate::db::{MarketplaceServer, MarketplaceStats, ReviewEntry, ServerPayload};

pub const API_URL_VAR: &str = "MARKETPLACE_API_URL";
pub const DEFAULT_API_URL: &str = "http://localhost:23333/api/marketplace";

/// Operations the sync store needs from the API.
pub trait MarketplaceApi: Send + Sync {
    fn get_servers(&self) -> impl Future<Output = ClientResult<Vec<MarketplaceServer>>> + Send;

    fn get_my_servers(&self)
    -> impl Future<Output = ClientResult<Vec<MarketplaceServer>>> + Send;

    fn get_server(&self, id: &str) -> impl Future<Output = ClientResult<MarketplaceServer>> + Send;

    fn create_server(
        &self,
        payload: &ServerPayload,
    ) -> impl Future<Output = ClientResult<MarketplaceServer>> + Send;

    fn update_server(
        &self,
        id: &str,
        payload: &ServerPayload,
    ) -> impl Future<Output = ClientResult<MarketplaceServer>> + Send;

    fn delete_server(&self, id: &str) -> impl Future<Output = ClientResult<()>> + Send;

    fn track_install(&self, id: &str) -> impl Future<Output = ClientResult<()>> + Send;

    fn track_uninstall(&self, id: &str) -> impl Future<Output = ClientResult<()>> + Send;

    fn get_reviews(&self, id: &str) -> impl Future<Output = ClientResult<Vec<ReviewEntry>>> + Send;

    fn create_review(
        &self,
        id: &str,
        rating: i64,
        review: Option<&str>,
    ) -> impl Future<Output = ClientResult<ReviewEntry>> + Send;

    fn get_stats(&self) -> impl Future<Output = ClientResult<MarketplaceStats>> + Send;
}

/// Install the TLS crypto provider reqwest is built against. Idempotent.
pub fn init_crypto() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// API client for the marketplace REST API.
///
/// Every request defeats intermediary caches: a monotonic `_t` query
/// parameter plus no-cache headers. A 304 is retried once.
pub struct MarketplaceClient<I> {
    base_url: String,
    client: Client,
    identity: Arc<I>,
    cache_buster: AtomicU64,
}

impl<I: IdentityProvider> MarketplaceClient<I> {
    /// Create a new API client
    ///
    /// Priority for base URL:
    /// 1. Explicit `api_url` parameter
    /// 2. MARKETPLACE_API_URL environment variable
    /// 3. Default: http://localhost:23333/api/marketplace
    pub fn new(api_url: Option<String>, identity: Arc<I>) -> Self {
        init_crypto();
        let base_url = api_url
            .or_else(|| env::var(API_URL_VAR).ok())
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let seed = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
        Self {
            base_url,
            client: Client::new(),
            identity,
            cache_buster: AtomicU64::new(seed),
        }
    }

    /// Get the base URL being used
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn identity(&self) -> &Arc<I> {
        &self.identity
    }

    /// Strictly increasing within this client.
    fn next_cache_buster(&self) -> u64 {
        self.cache_buster.fetch_add(1, Ordering::SeqCst)
    }

    fn url(&self, path: &str) -> String {
        let separator = if path.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}_t={}",
            self.base_url,
            path,
            separator,
            self.next_cache_buster()
        )
    }

    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate")
            .header(PRAGMA, "no-cache")
            .header(EXPIRES, "0");

        if let Some(token) = self.identity.access_token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(user) = self.identity.current_user() {
            builder = builder.header("X-User-Id", user.id);
            if let Some(email) = user.email {
                builder = builder.header("X-User-Email", email);
            }
            if let Some(name) = user.name {
                builder = builder.header("X-User-Name", name);
            }
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> ClientResult<Response> {
        let response = self.request(method.clone(), path, body).send().await?;
        if response.status() != StatusCode::NOT_MODIFIED {
            return Ok(response);
        }

        debug!(path, "Got 304 despite cache busting, retrying once");
        Ok(self.request(method, path, body).send().await?)
    }

    /// Send a request and unwrap the `{success, data, error}` envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ClientResult<Option<T>> {
        let response = self.execute(method, path, body.as_ref()).await?;
        let status = response.status();

        if status.is_success() {
            let envelope: ApiResponse<T> =
                response.json().await.map_err(|e| ClientError::InvalidResponse {
                    message: e.to_string(),
                })?;
            if !envelope.success {
                return Err(ClientError::Api {
                    status: status.as_u16(),
                    message: envelope
                        .error
                        .unwrap_or_else(|| "Request failed".to_string()),
                });
            }
            return Ok(envelope.data);
        }

        let text = response.text().await.unwrap_or_default();
        let server_message = serde_json::from_str::<ApiResponse<Value>>(&text)
            .ok()
            .and_then(|r| r.error);

        let message = match status {
            StatusCode::UNAUTHORIZED => {
                warn!(path, "Session rejected by API, signing out");
                self.identity.sign_out();
                "Please sign in again".to_string()
            }
            StatusCode::FORBIDDEN => "You do not have permission to perform this action".to_string(),
            StatusCode::TOO_MANY_REQUESTS => "Too many requests, please try again later".to_string(),
            _ => server_message
                .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16())),
        };

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn call_data<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ClientResult<T> {
        self.call(method, path, body)
            .await?
            .ok_or_else(|| ClientError::InvalidResponse {
                message: format!("response to {} carried no data", path),
            })
    }

    async fn call_list<T: DeserializeOwned>(&self, path: &str) -> ClientResult<Vec<T>> {
        Ok(self
            .call::<Vec<T>>(Method::GET, path, None)
            .await?
            .unwrap_or_default())
    }

    async fn call_empty(&self, method: Method, path: &str) -> ClientResult<()> {
        self.call::<Value>(method, path, None).await.map(|_| ())
    }
}

impl<I: IdentityProvider> MarketplaceApi for MarketplaceClient<I> {
    async fn get_servers(&self) -> ClientResult<Vec<MarketplaceServer>> {
        self.call_list("/servers").await
    }

    async fn get_my_servers(&self) -> ClientResult<Vec<MarketplaceServer>> {
        self.call_list("/servers/my").await
    }

    async fn get_server(&self, id: &str) -> ClientResult<MarketplaceServer> {
        self.call_data(Method::GET, &format!("/servers/{}", id), None)
            .await
    }

    async fn create_server(&self, payload: &ServerPayload) -> ClientResult<MarketplaceServer> {
        let body = serde_json::to_value(payload)?;
        self.call_data(Method::POST, "/servers", Some(body)).await
    }

    async fn update_server(
        &self,
        id: &str,
        payload: &ServerPayload,
    ) -> ClientResult<MarketplaceServer> {
        let body = serde_json::to_value(payload)?;
        self.call_data(Method::PUT, &format!("/servers/{}", id), Some(body))
            .await
    }

    async fn delete_server(&self, id: &str) -> ClientResult<()> {
        self.call_empty(Method::DELETE, &format!("/servers/{}", id))
            .await
    }

    async fn track_install(&self, id: &str) -> ClientResult<()> {
        self.call_empty(Method::POST, &format!("/servers/{}/install", id))
            .await
    }

    async fn track_uninstall(&self, id: &str) -> ClientResult<()> {
        self.call_empty(Method::POST, &format!("/servers/{}/uninstall", id))
            .await
    }

    async fn get_reviews(&self, id: &str) -> ClientResult<Vec<ReviewEntry>> {
        self.call_list(&format!("/servers/{}/reviews", id)).await
    }

    async fn create_review(
        &self,
        id: &str,
        rating: i64,
        review: Option<&str>,
    ) -> ClientResult<ReviewEntry> {
        let body = json!({ "rating": rating, "review": review });
        self.call_data(Method::POST, &format!("/servers/{}/reviews", id), Some(body))
            .await
    }

    async fn get_stats(&self) -> ClientResult<MarketplaceStats> {
        self.call_data(Method::GET, "/stats", None).await
    }
}
