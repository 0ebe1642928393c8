use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::secret::GroupUpdateSecretsCollection;
use super::validation::{EntityValidationError, FieldError, ObjectReader, Rule};

const GROUP_ENTITY: &str = "Group";
const UPDATE_ENTITY: &str = "GroupUpdate";

/// Maximum length of a group name.
pub const GROUP_NAME_MAX_LENGTH: usize = 255;

/// A membership of a user in a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub is_admin: bool,
}

/// A group with its complete membership.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub groups_users: Vec<GroupUser>,
}

impl Group {
    pub fn from_value(value: &Value) -> Result<Self, EntityValidationError> {
        let mut reader = ObjectReader::new(value);
        let id = reader.required_uuid("id");
        let name = reader.bounded_str("name", GROUP_NAME_MAX_LENGTH);
        let members = reader.optional_array("groups_users");

        let mut groups_users = Vec::new();
        let mut member_errors = Vec::new();
        for (index, member) in members.into_iter().flatten().enumerate() {
            let mut member_reader = ObjectReader::at_index(member, index);
            let id = member_reader.optional_uuid("id");
            let user_id = member_reader.required_uuid("user_id");
            let is_admin = member_reader.required_bool("is_admin");
            match (user_id, is_admin) {
                (Some(user_id), Some(is_admin)) if member_reader.is_clean() => {
                    groups_users.push(GroupUser {
                        id,
                        user_id,
                        is_admin,
                    });
                }
                _ => member_errors.extend(member_reader.into_errors()),
            }
        }
        if !member_errors.is_empty() {
            reader.absorb(
                "groups_users",
                EntityValidationError::new(GROUP_ENTITY, member_errors),
            );
        }

        match (id, name) {
            (Some(id), Some(name)) if reader.is_clean() => Ok(Self {
                id,
                name: name.to_string(),
                groups_users,
            }),
            _ => Err(reader.into_error(GROUP_ENTITY)),
        }
    }

    pub fn member(&self, user_id: Uuid) -> Option<&GroupUser> {
        self.groups_users.iter().find(|m| m.user_id == user_id)
    }
}

/// One membership change in a group update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GroupUserChange {
    Add { user_id: Uuid, is_admin: bool },
    Update { id: Uuid, is_admin: bool },
    Delete { id: Uuid, delete: bool },
}

impl GroupUserChange {
    fn read(reader: &mut ObjectReader<'_>) -> Option<Self> {
        let id = reader.optional_uuid("id");
        let user_id = reader.optional_uuid("user_id");
        let is_admin = reader.optional_bool("is_admin");
        let delete = reader.optional_bool("delete");
        if !reader.is_clean() {
            return None;
        }
        match (id, user_id, is_admin, delete) {
            (Some(id), _, _, Some(true)) => Some(Self::Delete { id, delete: true }),
            (Some(id), _, Some(is_admin), _) => Some(Self::Update { id, is_admin }),
            (None, Some(user_id), Some(is_admin), _) => Some(Self::Add { user_id, is_admin }),
            (None, Some(_), None, _) | (Some(_), _, None, _) => {
                reader.push("is_admin", Rule::Required, "The is_admin is required.");
                None
            }
            (None, None, _, _) => {
                reader.push("user_id", Rule::Required, "The user_id is required.");
                None
            }
        }
    }

    /// The user added by this change, if any.
    pub fn added_user(&self) -> Option<Uuid> {
        match self {
            Self::Add { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }
}

/// A group update request: new name plus membership delta.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupUpdate {
    pub id: Uuid,
    pub name: String,
    pub groups_users: Vec<GroupUserChange>,
}

impl GroupUpdate {
    /// Compute the delta between a group and its edited version.
    ///
    /// Members are matched by `user_id`. New members are added, members whose
    /// role changed are updated and missing members are deleted.
    pub fn from_groups_diff(original: &Group, updated: &Group) -> Result<Self, EntityValidationError> {
        let before: HashMap<Uuid, &GroupUser> =
            original.groups_users.iter().map(|m| (m.user_id, m)).collect();
        let mut changes = Vec::new();
        let mut errors = Vec::new();

        for member in &updated.groups_users {
            match before.get(&member.user_id) {
                None => changes.push(GroupUserChange::Add {
                    user_id: member.user_id,
                    is_admin: member.is_admin,
                }),
                Some(existing) if existing.is_admin != member.is_admin => match existing.id {
                    Some(id) => changes.push(GroupUserChange::Update {
                        id,
                        is_admin: member.is_admin,
                    }),
                    None => errors.push(missing_membership_id(member.user_id)),
                },
                Some(_) => {}
            }
        }

        for member in &original.groups_users {
            if updated.member(member.user_id).is_none() {
                match member.id {
                    Some(id) => changes.push(GroupUserChange::Delete { id, delete: true }),
                    None => errors.push(missing_membership_id(member.user_id)),
                }
            }
        }

        if !errors.is_empty() {
            return Err(EntityValidationError::new(UPDATE_ENTITY, errors));
        }

        Ok(Self {
            id: original.id,
            name: updated.name.clone(),
            groups_users: changes,
        })
    }

    pub fn from_value(value: &Value) -> Result<Self, EntityValidationError> {
        let mut reader = ObjectReader::new(value);
        let id = reader.required_uuid("id");
        let name = reader.bounded_str("name", GROUP_NAME_MAX_LENGTH);
        let change_values = reader.optional_array("groups_users");

        let mut groups_users = Vec::new();
        let mut change_errors = Vec::new();
        for (index, change) in change_values.into_iter().flatten().enumerate() {
            let mut change_reader = ObjectReader::at_index(change, index);
            match GroupUserChange::read(&mut change_reader) {
                Some(change) => groups_users.push(change),
                None => change_errors.extend(change_reader.into_errors()),
            }
        }
        if !change_errors.is_empty() {
            reader.absorb(
                "groups_users",
                EntityValidationError::new(UPDATE_ENTITY, change_errors),
            );
        }

        match (id, name) {
            (Some(id), Some(name)) if reader.is_clean() => Ok(Self {
                id,
                name: name.to_string(),
                groups_users,
            }),
            _ => Err(reader.into_error(UPDATE_ENTITY)),
        }
    }

    /// Users this update adds to the group.
    pub fn added_users(&self) -> Vec<Uuid> {
        self.groups_users
            .iter()
            .filter_map(GroupUserChange::added_user)
            .collect()
    }
}

fn missing_membership_id(user_id: Uuid) -> FieldError {
    FieldError {
        path: "groups_users".to_string(),
        index: None,
        rule: Rule::Required,
        message: format!("The membership of user {} has no id.", user_id),
    }
}

/// Final body submitted to update a group.
///
/// `secrets` is omitted from the JSON entirely when no secret had to be
/// encrypted; an empty array is not the same request.
#[derive(Debug, Clone, Serialize)]
pub struct GroupUpdatePayload {
    pub id: Uuid,
    pub name: String,
    pub groups_users: Vec<GroupUserChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<GroupUpdateSecretsCollection>,
}

impl GroupUpdatePayload {
    pub fn new(update: GroupUpdate, secrets: Option<GroupUpdateSecretsCollection>) -> Self {
        Self {
            id: update.id,
            name: update.name,
            groups_users: update.groups_users,
            secrets,
        }
    }
}
