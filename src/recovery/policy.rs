use super::org_key::{KeyValidationError, OrganizationKeyValidator};
use crate::api::{account_recovery, ApiClient, ApiError};
use crate::entity::account_recovery::OrganizationPolicy;

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid organization policy: {0}")]
    Invalid(String),
    #[error(transparent)]
    Key(#[from] KeyValidationError),
}

/// Reads and updates the organization account recovery policy.
pub struct OrganizationPolicyService<'a> {
    api: &'a dyn ApiClient,
    validator: OrganizationKeyValidator<'a>,
}

impl<'a> OrganizationPolicyService<'a> {
    pub fn new(api: &'a dyn ApiClient, validator: OrganizationKeyValidator<'a>) -> Self {
        Self { api, validator }
    }

    pub async fn find(&self) -> Result<OrganizationPolicy, PolicyError> {
        Ok(account_recovery::find(self.api).await?)
    }

    /// Validate the key an updated policy would install, given the policy
    /// currently in force.
    pub async fn validate_key(
        &self,
        updated: &OrganizationPolicy,
        current: &OrganizationPolicy,
    ) -> Result<(), PolicyError> {
        let Some(new_key) = updated.public_armored_key() else {
            if updated.is_enabled() {
                return Err(PolicyError::Invalid(format!(
                    "a {} policy needs an organization public key",
                    updated.policy
                )));
            }
            return Ok(());
        };

        let current_key = current.public_armored_key();
        if current_key == Some(new_key) {
            tracing::debug!("organization key unchanged, skipping validation");
            return Ok(());
        }
        self.validator.validate(new_key, current_key).await?;
        Ok(())
    }

    /// Save `updated` after checking any new organization key against the
    /// policy currently on the server.
    pub async fn save(&self, updated: &OrganizationPolicy) -> Result<OrganizationPolicy, PolicyError> {
        let current = self.find().await?;
        self.validate_key(updated, &current).await?;
        let saved = account_recovery::save(self.api, updated).await?;
        tracing::info!("organization policy saved as {}", saved.policy);
        Ok(saved)
    }
}
