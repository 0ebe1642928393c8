use super::{ApiClient, ApiError};
use crate::entity::gpgkey::Gpgkey;

/// `GET /gpgkeys`: every user's public key known to the server.
pub async fn find_all(api: &dyn ApiClient) -> Result<Vec<Gpgkey>, ApiError> {
    let value = api.get("/gpgkeys").await?;
    let items = value
        .as_array()
        .ok_or_else(|| ApiError::InvalidResponse("expected a list of keys".to_string()))?;
    Gpgkey::list_from_values(items).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}
