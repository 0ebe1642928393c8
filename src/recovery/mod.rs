//! Organization account recovery: key validation and policy management.

pub mod org_key;
pub mod policy;

pub use org_key::{KeyPolicy, KeyValidationError, OrganizationKeyValidator};
pub use policy::{OrganizationPolicyService, PolicyError};
