use std::sync::Arc;

use async_trait::async_trait;

use super::{ApiClient, ApiError};

/// Where the server's own key fingerprint comes from.
#[async_trait]
pub trait ServerKeySource: Send + Sync {
    async fn server_fingerprint(&self) -> Result<String, ApiError>;
}

/// Reads the fingerprint from `GET /auth/verify`.
pub struct ApiServerKey {
    api: Arc<dyn ApiClient>,
}

impl ApiServerKey {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ServerKeySource for ApiServerKey {
    async fn server_fingerprint(&self) -> Result<String, ApiError> {
        let value = self.api.get("/auth/verify").await?;
        value
            .get("fingerprint")
            .and_then(|f| f.as_str())
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::InvalidResponse("server key has no fingerprint".to_string()))
    }
}

/// A fingerprint known ahead of time, e.g. from the manifest.
pub struct StaticServerKey(pub String);

#[async_trait]
impl ServerKeySource for StaticServerKey {
    async fn server_fingerprint(&self) -> Result<String, ApiError> {
        Ok(self.0.clone())
    }
}
