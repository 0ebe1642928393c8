//! Collaborator interface to the passbolt-style REST API.
//!
//! The client speaks JSON values; each endpoint module turns them into
//! validated entities.

pub mod account_recovery;
pub mod gpgkeys;
pub mod groups;
pub mod server_key;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub use server_key::{ApiServerKey, ServerKeySource, StaticServerKey};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("server responded {status}: {message}")]
    Http { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Minimal REST client. Paths are relative to the API root.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, ApiError>;
    async fn create(&self, path: &str, body: &Value) -> Result<Value, ApiError>;
    async fn update(&self, path: &str, body: &Value) -> Result<Value, ApiError>;
    async fn delete(&self, path: &str) -> Result<Value, ApiError>;
}

pub(crate) fn to_body<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::Transport(format!("could not encode request body: {}", e)))
}
