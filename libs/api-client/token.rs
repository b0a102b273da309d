use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use realtime::{HeaderProvider, Headers};
use std::sync::Arc;

/// Holds the bearer token attached to every request
pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: String);
    fn clear(&self);
}

/// Process-local token store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set_token(&self, token: String) {
        *self.token.write() = Some(token);
    }

    fn clear(&self) {
        *self.token.write() = None;
    }
}

/// Obtains a fresh token after the server rejected the current one
///
/// # Example
/// ```ignore
/// struct SessionRefresher { identity: IdentityClient }
///
/// #[async_trait::async_trait]
/// impl TokenRefresher for SessionRefresher {
///     async fn refresh(&self) -> Result<String> {
///         self.identity.refresh_session().await
///     }
/// }
/// ```
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<String>;
}

/// Handshake headers carrying the current bearer token
///
/// Lets the realtime connection authenticate with the same token as the
/// REST client; the token is re-read before every dial.
pub struct BearerHeaders {
    tokens: Arc<dyn TokenStore>,
}

impl BearerHeaders {
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl HeaderProvider for BearerHeaders {
    async fn get_headers(&self) -> Headers {
        let mut headers = Headers::new();
        if let Some(token) = self.tokens.token() {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        headers
    }
}
