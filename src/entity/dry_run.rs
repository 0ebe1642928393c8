use std::collections::HashSet;

use serde_json::Value;
use uuid::Uuid;

use super::needed_secret::NeededSecretsCollection;
use super::validation::{EntityValidationError, FieldError, ObjectReader, Rule};

const ENTITY: &str = "GroupUpdateDryRunResult";

/// A secret the acting user can already read, as returned by the dry-run.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailableSecret {
    pub resource_id: Uuid,
    pub user_id: Option<Uuid>,
    /// Armored message encrypted for the acting user.
    pub data: String,
}

/// Server answer to a group update dry-run.
#[derive(Debug, Clone, Default)]
pub struct GroupUpdateDryRunResult {
    pub needed_secrets: NeededSecretsCollection,
    pub secrets: Vec<AvailableSecret>,
}

impl GroupUpdateDryRunResult {
    pub fn from_value(value: &Value) -> Result<Self, EntityValidationError> {
        let mut reader = ObjectReader::new(value);
        let needed_values = reader.optional_array("needed_secrets");
        let secret_values = reader.optional_array("secrets");

        let mut needed_secrets = NeededSecretsCollection::default();
        if let Some(values) = needed_values {
            match NeededSecretsCollection::from_values(values) {
                Ok(collection) => needed_secrets = collection,
                Err(e) => reader.absorb("needed_secrets", e),
            }
        }

        let mut secrets = Vec::new();
        if let Some(values) = secret_values {
            match read_secrets(values) {
                Ok(items) => secrets = items,
                Err(errors) => reader.absorb("secrets", EntityValidationError::new(ENTITY, errors)),
            }
        }

        if !reader.is_clean() {
            return Err(reader.into_error(ENTITY));
        }
        Ok(Self {
            needed_secrets,
            secrets,
        })
    }

    /// Whether the update requires any secret to be encrypted for new members.
    pub fn needs_secrets(&self) -> bool {
        !self.needed_secrets.is_empty()
    }
}

fn read_secrets(values: &[Value]) -> Result<Vec<AvailableSecret>, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut secrets = Vec::with_capacity(values.len());
    let mut resources = HashSet::with_capacity(values.len());

    for (index, value) in values.iter().enumerate() {
        let mut reader = ObjectReader::at_index(value, index);
        let resource_id = reader.required_uuid("resource_id");
        let user_id = reader.optional_uuid("user_id");
        let data = reader.required_armored("data");
        match (resource_id, data) {
            (Some(resource_id), Some(data)) if reader.is_clean() => {
                if !resources.insert(resource_id) {
                    errors.push(FieldError {
                        path: format!("{}.resource_id", index),
                        index: Some(index),
                        rule: Rule::Unique,
                        message: format!("The secret for resource {} is listed more than once.", resource_id),
                    });
                    continue;
                }
                secrets.push(AvailableSecret {
                    resource_id,
                    user_id,
                    data: data.to_string(),
                });
            }
            _ => errors.extend(reader.into_errors()),
        }
    }

    if errors.is_empty() {
        Ok(secrets)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DATA: &str = "-----BEGIN AGE ENCRYPTED FILE-----\nYWJj\n-----END AGE ENCRYPTED FILE-----\n";

    #[test]
    fn empty_result() {
        let result = GroupUpdateDryRunResult::from_value(&json!({})).unwrap();
        assert!(!result.needs_secrets());
        assert!(result.secrets.is_empty());
    }

    #[test]
    fn parses_needed_and_available() {
        let (u, r) = (Uuid::new_v4(), Uuid::new_v4());
        let value = json!({
            "needed_secrets": [{"user_id": u, "resource_id": r}],
            "secrets": [{"resource_id": r, "data": DATA}],
        });
        let result = GroupUpdateDryRunResult::from_value(&value).unwrap();
        assert!(result.needs_secrets());
        assert_eq!(result.secrets[0].resource_id, r);
    }

    #[test]
    fn nested_errors_are_prefixed() {
        let value = json!({
            "needed_secrets": [{"user_id": "x", "resource_id": Uuid::new_v4()}],
            "secrets": [{"resource_id": Uuid::new_v4(), "data": "plain"}],
        });
        let err = GroupUpdateDryRunResult::from_value(&value).unwrap_err();
        assert!(err.has_error("needed_secrets.0.user_id", Rule::Format));
        assert!(err.has_error("secrets.0.data", Rule::Format));
    }

    #[test]
    fn needed_secrets_must_be_an_array() {
        let err = GroupUpdateDryRunResult::from_value(&json!({"needed_secrets": {}})).unwrap_err();
        assert!(err.has_error("needed_secrets", Rule::Type));
    }
}
