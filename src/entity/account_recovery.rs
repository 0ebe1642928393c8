use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::validation::{EntityValidationError, ObjectReader, Rule};

const ENTITY: &str = "AccountRecoveryOrganizationPolicy";

/// How account recovery is enforced for the organization's users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PolicyKind {
    #[serde(rename = "disabled")]
    Disabled,
    #[serde(rename = "opt-in")]
    OptIn,
    #[serde(rename = "opt-out")]
    OptOut,
    #[serde(rename = "mandatory")]
    Mandatory,
}

impl PolicyKind {
    pub const ALL: [&'static str; 4] = ["disabled", "opt-in", "opt-out", "mandatory"];

    fn parse(value: &str) -> Option<Self> {
        match value {
            "disabled" => Some(Self::Disabled),
            "opt-in" => Some(Self::OptIn),
            "opt-out" => Some(Self::OptOut),
            "mandatory" => Some(Self::Mandatory),
            _ => None,
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disabled => "disabled",
            Self::OptIn => "opt-in",
            Self::OptOut => "opt-out",
            Self::Mandatory => "mandatory",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmoredKey {
    pub armored_key: String,
}

/// The organization-wide account recovery policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationPolicy {
    pub policy: PolicyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_recovery_organization_public_key: Option<ArmoredKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_recovery_organization_revoked_key: Option<ArmoredKey>,
}

impl OrganizationPolicy {
    pub fn disabled() -> Self {
        Self {
            policy: PolicyKind::Disabled,
            account_recovery_organization_public_key: None,
            account_recovery_organization_revoked_key: None,
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, EntityValidationError> {
        let mut reader = ObjectReader::new(value);
        let policy = reader
            .required_enum("policy", &PolicyKind::ALL)
            .and_then(PolicyKind::parse);
        let public_key = read_armored_key(&mut reader, "account_recovery_organization_public_key");
        let revoked_key = read_armored_key(&mut reader, "account_recovery_organization_revoked_key");

        if let Some(policy) = policy {
            if policy != PolicyKind::Disabled && public_key.is_none() && reader.is_clean() {
                reader.push(
                    "account_recovery_organization_public_key",
                    Rule::Required,
                    "An organization public key is required when account recovery is enabled.",
                );
            }
        }

        match policy {
            Some(policy) if reader.is_clean() => Ok(Self {
                policy,
                account_recovery_organization_public_key: public_key,
                account_recovery_organization_revoked_key: revoked_key,
            }),
            _ => Err(reader.into_error(ENTITY)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.policy != PolicyKind::Disabled
    }

    pub fn public_armored_key(&self) -> Option<&str> {
        self.account_recovery_organization_public_key
            .as_ref()
            .map(|k| k.armored_key.as_str())
    }
}

fn read_armored_key(reader: &mut ObjectReader<'_>, field: &str) -> Option<ArmoredKey> {
    let value = reader.field(field)?;
    let mut nested = ObjectReader::new(value);
    match nested.required_armored("armored_key") {
        Some(armored) if nested.is_clean() => Some(ArmoredKey {
            armored_key: armored.to_string(),
        }),
        _ => {
            reader.absorb(field, nested.into_error(ENTITY));
            None
        }
    }
}
