use std::collections::{HashMap, HashSet};
use std::fmt;

use serde_json::Value;
use uuid::Uuid;

use super::fanout::{encrypt_for_targets, FanoutError};
use super::needs::compute_missing_secrets;
use crate::api::{groups, ApiClient, ApiError};
use crate::crypto::{Cipher, CryptoError};
use crate::entity::dry_run::GroupUpdateDryRunResult;
use crate::entity::group::{GroupUpdate, GroupUpdatePayload};
use crate::entity::needed_secret::NeededSecret;
use crate::entity::EntityValidationError;
use crate::keys::{Keyring, KeyringError, UserIdentity};

/// Progress of a group update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupUpdateState {
    Init,
    DryRun,
    ComputeNeeds,
    SyncKeyring,
    Fanout,
    Submit,
    Done,
    Failed,
}

impl fmt::Display for GroupUpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::DryRun => "dry-run",
            Self::ComputeNeeds => "compute-needs",
            Self::SyncKeyring => "sync-keyring",
            Self::Fanout => "fanout",
            Self::Submit => "submit",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GroupUpdateError {
    #[error("group update dry-run failed: {0}")]
    DryRun(#[source] ApiError),
    #[error("invalid dry-run response: {0}")]
    InvalidDryRun(#[source] EntityValidationError),
    #[error("could not decrypt the secret of resource {resource_id}: {source}")]
    Decrypt {
        resource_id: Uuid,
        #[source]
        source: CryptoError,
    },
    #[error("could not sync the keyring: {0}")]
    KeyringSync(#[source] KeyringError),
    #[error("could not encrypt secrets for the new members: {0}")]
    Fanout(#[source] FanoutError),
    #[error("group update failed: {0}")]
    Submit(#[source] ApiError),
}

impl GroupUpdateError {
    /// The state the update was in when it failed.
    pub fn state(&self) -> GroupUpdateState {
        match self {
            Self::DryRun(_) => GroupUpdateState::DryRun,
            Self::InvalidDryRun(_) | Self::Decrypt { .. } => GroupUpdateState::ComputeNeeds,
            Self::KeyringSync(_) => GroupUpdateState::SyncKeyring,
            Self::Fanout(_) => GroupUpdateState::Fanout,
            Self::Submit(_) => GroupUpdateState::Submit,
        }
    }
}

struct Progress {
    group_id: Uuid,
    state: GroupUpdateState,
}

impl Progress {
    fn new(group_id: Uuid) -> Self {
        Self {
            group_id,
            state: GroupUpdateState::Init,
        }
    }

    fn advance(&mut self, next: GroupUpdateState) {
        tracing::debug!("group {}: {} -> {}", self.group_id, self.state, next);
        self.state = next;
    }
}

/// Updates a group and shares its secrets with the members it adds.
pub struct GroupUpdateOrchestrator<'a> {
    api: &'a dyn ApiClient,
    keyring: &'a dyn Keyring,
    cipher: &'a dyn Cipher,
    identity: &'a UserIdentity,
}

impl<'a> GroupUpdateOrchestrator<'a> {
    pub fn new(
        api: &'a dyn ApiClient,
        keyring: &'a dyn Keyring,
        cipher: &'a dyn Cipher,
        identity: &'a UserIdentity,
    ) -> Self {
        Self {
            api,
            keyring,
            cipher,
            identity,
        }
    }

    /// Run the update end to end and return the server's answer.
    ///
    /// The group is left untouched on the server unless the final submit
    /// succeeds.
    pub async fn update(&self, update: GroupUpdate) -> Result<Value, GroupUpdateError> {
        let mut progress = Progress::new(update.id);
        match self.run(update, &mut progress).await {
            Ok(response) => {
                progress.advance(GroupUpdateState::Done);
                Ok(response)
            }
            Err(e) => {
                tracing::debug!("group {} failed during {}: {}", progress.group_id, e.state(), e);
                progress.advance(GroupUpdateState::Failed);
                Err(e)
            }
        }
    }

    async fn run(&self, update: GroupUpdate, progress: &mut Progress) -> Result<Value, GroupUpdateError> {
        progress.advance(GroupUpdateState::DryRun);
        let dry_run = groups::dry_run(self.api, &update)
            .await
            .map_err(GroupUpdateError::DryRun)?;

        let payload = build_payload(
            update,
            &dry_run,
            self.keyring,
            self.cipher,
            self.identity,
            progress,
        )
        .await?;

        progress.advance(GroupUpdateState::Submit);
        let response = groups::update(self.api, &payload)
            .await
            .map_err(GroupUpdateError::Submit)?;
        tracing::info!(
            "group {} updated ({} change(s), {} secret(s) shared)",
            payload.id,
            payload.groups_users.len(),
            payload.secrets.as_ref().map_or(0, |s| s.len())
        );
        Ok(response)
    }
}

/// Turn a dry-run answer into the payload to submit, without talking to the
/// groups endpoints. The keyring is synced only if secrets must be shared.
pub async fn prepare_payload(
    update: GroupUpdate,
    dry_run: &Value,
    keyring: &dyn Keyring,
    cipher: &dyn Cipher,
    identity: &UserIdentity,
) -> Result<GroupUpdatePayload, GroupUpdateError> {
    let mut progress = Progress::new(update.id);
    progress.state = GroupUpdateState::DryRun;
    build_payload(update, dry_run, keyring, cipher, identity, &mut progress).await
}

async fn build_payload(
    update: GroupUpdate,
    dry_run: &Value,
    keyring: &dyn Keyring,
    cipher: &dyn Cipher,
    identity: &UserIdentity,
    progress: &mut Progress,
) -> Result<GroupUpdatePayload, GroupUpdateError> {
    progress.advance(GroupUpdateState::ComputeNeeds);
    let dry_run =
        GroupUpdateDryRunResult::from_value(dry_run).map_err(GroupUpdateError::InvalidDryRun)?;
    if !dry_run.needs_secrets() {
        tracing::debug!("group {} needs no new secrets", update.id);
        return Ok(GroupUpdatePayload::new(update, None));
    }
    let work = compute_missing_secrets(&dry_run, &update);
    let plaintexts = decrypt_needed(&dry_run, &work, cipher, identity)?;

    progress.advance(GroupUpdateState::SyncKeyring);
    keyring.sync().await.map_err(GroupUpdateError::KeyringSync)?;

    progress.advance(GroupUpdateState::Fanout);
    let secrets = encrypt_for_targets(&work, &plaintexts, keyring, cipher, identity)
        .await
        .map_err(GroupUpdateError::Fanout)?;

    Ok(GroupUpdatePayload::new(update, Some(secrets)))
}

/// Decrypt the acting user's copy of every resource in the work list.
/// Resources the dry-run did not return a copy for are left to the fanout
/// to report.
fn decrypt_needed(
    dry_run: &GroupUpdateDryRunResult,
    work: &[NeededSecret],
    cipher: &dyn Cipher,
    identity: &UserIdentity,
) -> Result<HashMap<Uuid, Vec<u8>>, GroupUpdateError> {
    let wanted: HashSet<Uuid> = work.iter().map(|n| n.resource_id).collect();
    let mut plaintexts = HashMap::with_capacity(wanted.len());
    for secret in dry_run.secrets.iter().filter(|s| wanted.contains(&s.resource_id)) {
        let plaintext = cipher
            .decrypt(&secret.data, identity, None)
            .map_err(|source| GroupUpdateError::Decrypt {
                resource_id: secret.resource_id,
                source,
            })?;
        plaintexts.insert(secret.resource_id, plaintext);
    }
    tracing::debug!("decrypted {} secret(s) to share", plaintexts.len());
    Ok(plaintexts)
}
