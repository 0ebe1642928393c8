use serde_json::Value;

use super::{to_body, ApiClient, ApiError};
use crate::entity::group::{GroupUpdate, GroupUpdatePayload};

/// `PUT /groups/:id/dry-run`. The raw answer is returned so the caller can
/// report validation failures separately from transport failures.
pub async fn dry_run(api: &dyn ApiClient, update: &GroupUpdate) -> Result<Value, ApiError> {
    let path = format!("/groups/{}/dry-run", update.id);
    tracing::debug!("PUT {}", path);
    api.update(&path, &to_body(update)?).await
}

/// `PUT /groups/:id`.
pub async fn update(api: &dyn ApiClient, payload: &GroupUpdatePayload) -> Result<Value, ApiError> {
    let path = format!("/groups/{}", payload.id);
    tracing::debug!("PUT {}", path);
    api.update(&path, &to_body(payload)?).await
}
