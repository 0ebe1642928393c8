use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::validation::{EntityValidationError, ObjectReader};

const SECRET_ENTITY: &str = "GroupUpdateSecret";
const COLLECTION_ENTITY: &str = "GroupUpdateSecretsCollection";

/// A secret encrypted for one user, submitted with a group update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupUpdateSecret {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub resource_id: Uuid,
    pub user_id: Uuid,
    /// Armored encrypted message.
    pub data: String,
}

impl GroupUpdateSecret {
    pub fn new(resource_id: Uuid, user_id: Uuid, data: String) -> Self {
        Self {
            id: None,
            resource_id,
            user_id,
            data,
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, EntityValidationError> {
        let mut reader = ObjectReader::new(value);
        Self::read(&mut reader).ok_or_else(|| reader.into_error(SECRET_ENTITY))
    }

    fn read(reader: &mut ObjectReader<'_>) -> Option<Self> {
        let id = reader.optional_uuid("id");
        let resource_id = reader.required_uuid("resource_id");
        let user_id = reader.required_uuid("user_id");
        let data = reader.required_armored("data");
        if !reader.is_clean() {
            return None;
        }
        Some(Self {
            id,
            resource_id: resource_id?,
            user_id: user_id?,
            data: data?.to_string(),
        })
    }
}

/// Ordered secrets to submit with a group update.
///
/// Ids and `(resource_id, user_id)` pairs are unique within one collection.
/// Both are tracked in hash sets so insertion stays O(1) per entry.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct GroupUpdateSecretsCollection {
    items: Vec<GroupUpdateSecret>,
    #[serde(skip)]
    ids: HashSet<Uuid>,
    #[serde(skip)]
    pairs: HashSet<(Uuid, Uuid)>,
}

impl GroupUpdateSecretsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from entries, failing on the first duplicate.
    pub fn try_from_entries(
        entries: impl IntoIterator<Item = GroupUpdateSecret>,
    ) -> Result<Self, EntityValidationError> {
        let entries = entries.into_iter();
        let mut collection = Self {
            items: Vec::with_capacity(entries.size_hint().0),
            ..Default::default()
        };
        for entry in entries {
            collection.push(entry)?;
        }
        Ok(collection)
    }

    /// Parse and validate a JSON array of secrets.
    pub fn from_values(values: &[Value]) -> Result<Self, EntityValidationError> {
        let mut errors = Vec::new();
        let mut entries = Vec::with_capacity(values.len());
        for (index, value) in values.iter().enumerate() {
            let mut reader = ObjectReader::at_index(value, index);
            match GroupUpdateSecret::read(&mut reader) {
                Some(entry) => entries.push(entry),
                None => errors.extend(reader.into_errors()),
            }
        }
        if !errors.is_empty() {
            return Err(EntityValidationError::new(COLLECTION_ENTITY, errors));
        }
        Self::try_from_entries(entries)
    }

    /// Append an entry, rejecting duplicate ids and duplicate pairs.
    pub fn push(&mut self, entry: GroupUpdateSecret) -> Result<(), EntityValidationError> {
        let index = self.items.len();
        if let Some(id) = entry.id {
            if self.ids.contains(&id) {
                return Err(EntityValidationError::unique(
                    COLLECTION_ENTITY,
                    index,
                    "id",
                    format!("The secret id {} is already present in the collection.", id),
                ));
            }
        }
        let pair = (entry.resource_id, entry.user_id);
        if self.pairs.contains(&pair) {
            return Err(EntityValidationError::unique(
                COLLECTION_ENTITY,
                index,
                "resource_id",
                format!(
                    "A secret for resource {} and user {} is already present in the collection.",
                    entry.resource_id, entry.user_id
                ),
            ));
        }
        if let Some(id) = entry.id {
            self.ids.insert(id);
        }
        self.pairs.insert(pair);
        self.items.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GroupUpdateSecret> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a GroupUpdateSecretsCollection {
    type Item = &'a GroupUpdateSecret;
    type IntoIter = std::slice::Iter<'a, GroupUpdateSecret>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::validation::Rule;
    use serde_json::json;
    use std::time::{Duration, Instant};

    const DATA: &str = "-----BEGIN AGE ENCRYPTED FILE-----\nYWJj\n-----END AGE ENCRYPTED FILE-----\n";

    fn secret(resource_id: Uuid, user_id: Uuid) -> GroupUpdateSecret {
        GroupUpdateSecret::new(resource_id, user_id, DATA.to_string())
    }

    #[test]
    fn duplicate_pair_rejected_on_push() {
        let (r, u) = (Uuid::new_v4(), Uuid::new_v4());
        let mut collection = GroupUpdateSecretsCollection::new();
        collection.push(secret(r, u)).unwrap();
        collection.push(secret(r, Uuid::new_v4())).unwrap();

        let err = collection.push(secret(r, u)).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].index, Some(2));
        assert_eq!(err.errors[0].rule, Rule::Unique);
        assert_eq!(err.errors[0].path, "2.resource_id");
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn duplicate_pair_rejected_in_bulk_any_order() {
        let (r, u) = (Uuid::new_v4(), Uuid::new_v4());
        let entries = vec![
            secret(Uuid::new_v4(), u),
            secret(r, u),
            secret(Uuid::new_v4(), Uuid::new_v4()),
            secret(r, u),
        ];
        let err = GroupUpdateSecretsCollection::try_from_entries(entries).unwrap_err();
        assert_eq!(err.errors[0].index, Some(3));

        let entries = vec![secret(r, u), secret(r, u)];
        let err = GroupUpdateSecretsCollection::try_from_entries(entries).unwrap_err();
        assert_eq!(err.errors[0].index, Some(1));
    }

    #[test]
    fn duplicate_id_rejected() {
        let id = Uuid::new_v4();
        let mut first = secret(Uuid::new_v4(), Uuid::new_v4());
        first.id = Some(id);
        let mut second = secret(Uuid::new_v4(), Uuid::new_v4());
        second.id = Some(id);

        let err = GroupUpdateSecretsCollection::try_from_entries(vec![first, second]).unwrap_err();
        assert!(err.has_error("1.id", Rule::Unique));
    }

    #[test]
    fn from_values_reports_field_errors_by_index() {
        let values = vec![
            json!({"resource_id": Uuid::new_v4(), "user_id": Uuid::new_v4(), "data": DATA}),
            json!({"resource_id": "nope", "data": "not armored"}),
        ];
        let err = GroupUpdateSecretsCollection::from_values(&values).unwrap_err();
        assert!(err.has_error("1.resource_id", Rule::Format));
        assert!(err.has_error("1.user_id", Rule::Required));
        assert!(err.has_error("1.data", Rule::Format));
    }

    #[test]
    fn serializes_as_plain_array() {
        let (r, u) = (Uuid::new_v4(), Uuid::new_v4());
        let collection = GroupUpdateSecretsCollection::try_from_entries(vec![secret(r, u)]).unwrap();
        let value = serde_json::to_value(&collection).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["resource_id"], json!(r));
        assert!(value[0].get("id").is_none());
    }

    #[test]
    fn ten_thousand_entries_build_quickly() {
        let values: Vec<Value> = (0..10_000)
            .map(|_| {
                json!({
                    "id": Uuid::new_v4(),
                    "resource_id": Uuid::new_v4(),
                    "user_id": Uuid::new_v4(),
                    "data": DATA,
                })
            })
            .collect();

        let start = Instant::now();
        let collection = GroupUpdateSecretsCollection::from_values(&values).unwrap();
        assert_eq!(collection.len(), 10_000);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
