use serde_json::Value;
use uuid::Uuid;

use super::validation::{EntityValidationError, ObjectReader};

const ENTITY: &str = "Gpgkey";

/// A user's public key as served by the API.
#[derive(Debug, Clone, PartialEq)]
pub struct Gpgkey {
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub armored_key: String,
    pub fingerprint: Option<String>,
    pub deleted: bool,
}

impl Gpgkey {
    pub fn from_value(value: &Value) -> Result<Self, EntityValidationError> {
        let mut reader = ObjectReader::new(value);
        Self::read(&mut reader).ok_or_else(|| reader.into_error(ENTITY))
    }

    fn read(reader: &mut ObjectReader<'_>) -> Option<Self> {
        let id = reader.optional_uuid("id");
        let user_id = reader.required_uuid("user_id");
        let armored_key = reader.required_armored("armored_key");
        let fingerprint = reader.optional_str("fingerprint");
        let deleted = reader.optional_bool("deleted");
        if !reader.is_clean() {
            return None;
        }
        Some(Self {
            id,
            user_id: user_id?,
            armored_key: armored_key?.to_string(),
            fingerprint: fingerprint.map(str::to_string),
            deleted: deleted.unwrap_or(false),
        })
    }

    /// Parse a list of keys; every invalid item is reported with its index.
    pub fn list_from_values(values: &[Value]) -> Result<Vec<Self>, EntityValidationError> {
        let mut keys = Vec::with_capacity(values.len());
        let mut errors = Vec::new();
        for (index, value) in values.iter().enumerate() {
            let mut reader = ObjectReader::at_index(value, index);
            match Self::read(&mut reader) {
                Some(key) => keys.push(key),
                None => errors.extend(reader.into_errors()),
            }
        }
        if errors.is_empty() {
            Ok(keys)
        } else {
            Err(EntityValidationError::new("GpgkeysCollection", errors))
        }
    }
}
