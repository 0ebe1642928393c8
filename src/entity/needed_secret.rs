use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::validation::{EntityValidationError, ObjectReader, Rule};

const COLLECTION_ENTITY: &str = "NeededSecretsCollection";

/// A secret the server requires for a user who does not have it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NeededSecret {
    pub user_id: Uuid,
    pub resource_id: Uuid,
}

impl NeededSecret {
    fn read(reader: &mut ObjectReader<'_>) -> Option<Self> {
        let user_id = reader.required_uuid("user_id");
        let resource_id = reader.required_uuid("resource_id");
        Some(Self {
            user_id: user_id?,
            resource_id: resource_id?,
        })
    }
}

/// Needed secrets reported by a dry-run, unique by `(resource_id, user_id)`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct NeededSecretsCollection {
    items: Vec<NeededSecret>,
}

impl NeededSecretsCollection {
    pub fn from_values(values: &[Value]) -> Result<Self, EntityValidationError> {
        let mut errors = Vec::new();
        let mut items = Vec::with_capacity(values.len());
        let mut seen = HashSet::with_capacity(values.len());

        for (index, value) in values.iter().enumerate() {
            let mut reader = ObjectReader::at_index(value, index);
            let Some(needed) = NeededSecret::read(&mut reader) else {
                errors.extend(reader.into_errors());
                continue;
            };
            if !seen.insert((needed.resource_id, needed.user_id)) {
                reader.push(
                    "resource_id",
                    Rule::Unique,
                    format!(
                        "The secret for resource {} and user {} is listed more than once.",
                        needed.resource_id, needed.user_id
                    ),
                );
                errors.extend(reader.into_errors());
                continue;
            }
            items.push(needed);
        }

        if !errors.is_empty() {
            return Err(EntityValidationError::new(COLLECTION_ENTITY, errors));
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NeededSecret> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<NeededSecret> {
        self.items.clone()
    }
}
