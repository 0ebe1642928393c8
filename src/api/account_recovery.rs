use super::{to_body, ApiClient, ApiError};
use crate::entity::account_recovery::OrganizationPolicy;

const PATH: &str = "/account-recovery/organization-policies";

/// `GET /account-recovery/organization-policies`.
pub async fn find(api: &dyn ApiClient) -> Result<OrganizationPolicy, ApiError> {
    let value = api.get(PATH).await?;
    OrganizationPolicy::from_value(&value).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

/// `POST /account-recovery/organization-policies`.
pub async fn save(
    api: &dyn ApiClient,
    policy: &OrganizationPolicy,
) -> Result<OrganizationPolicy, ApiError> {
    let value = api.create(PATH, &to_body(policy)?).await?;
    OrganizationPolicy::from_value(&value).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}
