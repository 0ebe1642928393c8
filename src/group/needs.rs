use std::collections::HashSet;

use crate::entity::dry_run::GroupUpdateDryRunResult;
use crate::entity::group::GroupUpdate;
use crate::entity::needed_secret::NeededSecret;

/// The secrets that must be encrypted before `update` can be submitted.
///
/// The server's list is authoritative and returned in its order. Entries for
/// users the update does not add are kept but logged.
pub fn compute_missing_secrets(
    dry_run: &GroupUpdateDryRunResult,
    update: &GroupUpdate,
) -> Vec<NeededSecret> {
    let added: HashSet<_> = update.added_users().into_iter().collect();
    for needed in dry_run.needed_secrets.iter() {
        if !added.contains(&needed.user_id) {
            tracing::warn!(
                "server asks for resource {} for user {} who is not being added to group {}",
                needed.resource_id,
                needed.user_id,
                update.id
            );
        }
    }
    dry_run.needed_secrets.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::group::GroupUserChange;
    use serde_json::json;
    use uuid::Uuid;

    fn update_adding(users: &[Uuid]) -> GroupUpdate {
        GroupUpdate {
            id: Uuid::new_v4(),
            name: "ops".to_string(),
            groups_users: users
                .iter()
                .map(|&user_id| GroupUserChange::Add {
                    user_id,
                    is_admin: false,
                })
                .collect(),
        }
    }

    #[test]
    fn returns_server_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (r1, r2) = (Uuid::new_v4(), Uuid::new_v4());
        let dry_run = GroupUpdateDryRunResult::from_value(&json!({
            "needed_secrets": [
                {"user_id": b, "resource_id": r2},
                {"user_id": a, "resource_id": r1},
                {"user_id": b, "resource_id": r1},
            ]
        }))
        .unwrap();

        let work = compute_missing_secrets(&dry_run, &update_adding(&[a, b]));
        let pairs: Vec<_> = work.iter().map(|n| (n.user_id, n.resource_id)).collect();
        assert_eq!(pairs, vec![(b, r2), (a, r1), (b, r1)]);
    }

    #[test]
    fn no_needs_is_empty() {
        let dry_run = GroupUpdateDryRunResult::from_value(&json!({})).unwrap();
        assert!(compute_missing_secrets(&dry_run, &update_adding(&[])).is_empty());
    }

    #[test]
    fn keeps_needs_for_users_not_added() {
        let stranger = Uuid::new_v4();
        let dry_run = GroupUpdateDryRunResult::from_value(&json!({
            "needed_secrets": [{"user_id": stranger, "resource_id": Uuid::new_v4()}]
        }))
        .unwrap();
        let work = compute_missing_secrets(&dry_run, &update_adding(&[Uuid::new_v4()]));
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].user_id, stranger);
    }
}
