//! Authenticated REST client
//!
//! Every request carries the bearer token from the [`TokenStore`]. A 401 is
//! answered by one refresh through the [`TokenRefresher`] and one retry.
//! All outcomes are folded into an [`ApiResponse`]; failures additionally
//! raise an `error` toast when a queue is attached.

use crate::envelope::ApiResponse;
use crate::error::{ApiError, Result};
use crate::token::{MemoryTokenStore, TokenRefresher, TokenStore};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use toasts::ToastQueue;
use tracing::{debug, info, warn};

/// REST client for the dashboard backend
pub struct ApiClient {
    base_url: String,
    client: Client,
    tokens: Arc<dyn TokenStore>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    toasts: Option<ToastQueue>,
}

impl ApiClient {
    /// Create a client for `base_url` with an empty in-memory token store
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            tokens: Arc::new(MemoryTokenStore::new()),
            refresher: None,
            toasts: None,
        })
    }

    pub fn with_tokens(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_refresher(mut self, refresher: impl TokenRefresher + 'static) -> Self {
        self.refresher = Some(Arc::new(refresher));
        self
    }

    /// Raise an `error` toast for every failed request
    pub fn with_toasts(mut self, queue: ToastQueue) -> Self {
        self.toasts = Some(queue);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.tokens)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.call(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResponse<T> {
        match serde_json::to_value(body) {
            Ok(body) => self.call(Method::POST, path, Some(body)).await,
            Err(e) => self.fold(path, Err(ApiError::Decode(e.to_string()))),
        }
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResponse<T> {
        match serde_json::to_value(body) {
            Ok(body) => self.call(Method::PUT, path, Some(body)).await,
            Err(e) => self.fold(path, Err(ApiError::Decode(e.to_string()))),
        }
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.call(Method::DELETE, path, None).await
    }

    async fn call<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> ApiResponse<T> {
        let result = self.request(method, path, body.as_ref()).await;
        self.fold(path, result)
    }

    fn fold<T>(&self, path: &str, result: Result<T>) -> ApiResponse<T> {
        if let Err(e) = &result {
            warn!("Request to {} failed: {}", path, e);
            if let Some(queue) = &self.toasts {
                queue.error("Request failed", Some(e.to_string()), None);
            }
        }
        result.into()
    }

    /// Send once, and once more after a successful token refresh on 401
    async fn request<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<&Value>) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let response = self.send(method.clone(), &url, body).await?;
        let response = if response.status() == StatusCode::UNAUTHORIZED {
            let Some(refresher) = &self.refresher else {
                return Err(ApiError::Unauthorized(format!("{} {}", method, path)));
            };

            info!("Token rejected for {} {}, refreshing", method, path);
            let token = refresher.refresh().await?;
            self.tokens.set_token(token);

            let retried = self.send(method.clone(), &url, body).await?;
            if retried.status() == StatusCode::UNAUTHORIZED {
                self.tokens.clear();
                return Err(ApiError::Unauthorized(format!("{} {} after token refresh", method, path)));
            }
            retried
        } else {
            response
        };

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&text).unwrap_or_else(|| status.to_string()),
            });
        }

        let payload = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(payload).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<reqwest::Response> {
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(token) = self.tokens.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }
}

/// Pull a readable message out of an error body
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => ["error", "message"]
            .iter()
            .find_map(|field| value.get(*field).and_then(Value::as_str))
            .map(str::to_string)
            .or_else(|| Some(trimmed.to_string())),
        Err(_) => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"error":"listing not found"}"#).as_deref(), Some("listing not found"));
        assert_eq!(error_message(r#"{"message":"slow down"}"#).as_deref(), Some("slow down"));
        assert_eq!(error_message("gateway timeout").as_deref(), Some("gateway timeout"));
        assert_eq!(error_message("   "), None);
    }

    #[test]
    fn test_base_url_is_normalised() {
        let client = ApiClient::new("http://localhost:8080/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/api");
    }
}
