use std::collections::HashMap;

use uuid::Uuid;

use crate::crypto::{Cipher, CryptoError};
use crate::entity::needed_secret::NeededSecret;
use crate::entity::secret::{GroupUpdateSecret, GroupUpdateSecretsCollection};
use crate::entity::EntityValidationError;
use crate::keys::{Keyring, KeyringError, PublicKey, UserIdentity};

#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    #[error("no decrypted secret available for resource {0}")]
    MissingPlaintext(Uuid),
    #[error("no public key found for user {0}")]
    MissingPublicKey(Uuid),
    #[error(transparent)]
    Keyring(#[from] KeyringError),
    #[error("could not encrypt resource {resource_id} for user {user_id}: {source}")]
    Encrypt {
        resource_id: Uuid,
        user_id: Uuid,
        #[source]
        source: CryptoError,
    },
    #[error(transparent)]
    Collection(#[from] EntityValidationError),
}

/// Encrypt each needed secret for its recipient.
///
/// `plaintexts` maps a resource id to its decrypted secret. Each recipient's
/// key is looked up once. The first failure aborts the whole fanout.
pub async fn encrypt_for_targets(
    work: &[NeededSecret],
    plaintexts: &HashMap<Uuid, Vec<u8>>,
    keyring: &dyn Keyring,
    cipher: &dyn Cipher,
    signer: &UserIdentity,
) -> Result<GroupUpdateSecretsCollection, FanoutError> {
    let mut recipients: HashMap<Uuid, PublicKey> = HashMap::new();
    let mut secrets = Vec::with_capacity(work.len());

    for needed in work {
        let plaintext = plaintexts
            .get(&needed.resource_id)
            .ok_or(FanoutError::MissingPlaintext(needed.resource_id))?;

        if !recipients.contains_key(&needed.user_id) {
            let key = keyring
                .find_public(needed.user_id)
                .await?
                .ok_or(FanoutError::MissingPublicKey(needed.user_id))?;
            recipients.insert(needed.user_id, key);
        }
        let recipient = &recipients[&needed.user_id];

        let data = cipher
            .encrypt(plaintext, recipient, signer)
            .map_err(|source| FanoutError::Encrypt {
                resource_id: needed.resource_id,
                user_id: needed.user_id,
                source,
            })?;
        tracing::debug!(
            "encrypted resource {} for user {}",
            needed.resource_id,
            needed.user_id
        );
        secrets.push(GroupUpdateSecret::new(needed.resource_id, needed.user_id, data));
    }

    Ok(GroupUpdateSecretsCollection::try_from_entries(secrets)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::AgeEngine;
    use crate::keys::{FileKeyring, KeyStore};
    use tempfile::TempDir;

    struct Setup {
        _dir: TempDir,
        keyring: FileKeyring,
        signer: UserIdentity,
        members: Vec<(Uuid, UserIdentity)>,
    }

    async fn setup(members: usize) -> Setup {
        let dir = TempDir::new().unwrap();
        let keyring = FileKeyring::offline(KeyStore::open_at(dir.path().to_path_buf()));
        let mut list = Vec::new();
        for _ in 0..members {
            let id = UserIdentity::generate();
            let user_id = Uuid::new_v4();
            keyring
                .import_public(&id.public_bundle("member"), user_id)
                .await
                .unwrap();
            list.push((user_id, id));
        }
        Setup {
            _dir: dir,
            keyring,
            signer: UserIdentity::generate(),
            members: list,
        }
    }

    #[tokio::test]
    async fn one_ciphertext_per_recipient() {
        let s = setup(2).await;
        let engine = AgeEngine::new();
        let resource = Uuid::new_v4();
        let work: Vec<_> = s
            .members
            .iter()
            .map(|(user_id, _)| NeededSecret {
                user_id: *user_id,
                resource_id: resource,
            })
            .collect();
        let plaintexts = HashMap::from([(resource, b"pw".to_vec())]);

        let secrets = encrypt_for_targets(&work, &plaintexts, &s.keyring, &engine, &s.signer)
            .await
            .unwrap();
        assert_eq!(secrets.len(), 2);

        for ((user_id, identity), secret) in s.members.iter().zip(secrets.iter()) {
            assert_eq!(secret.user_id, *user_id);
            let signer = s.signer.to_public_key(Uuid::nil());
            let plaintext = engine.decrypt(&secret.data, identity, Some(&signer)).unwrap();
            assert_eq!(plaintext, b"pw");
        }
        assert_ne!(secrets.iter().next().unwrap().data, secrets.iter().nth(1).unwrap().data);
    }

    #[tokio::test]
    async fn missing_plaintext_fails() {
        let s = setup(1).await;
        let work = [NeededSecret {
            user_id: s.members[0].0,
            resource_id: Uuid::new_v4(),
        }];
        let err = encrypt_for_targets(&work, &HashMap::new(), &s.keyring, &AgeEngine::new(), &s.signer)
            .await
            .unwrap_err();
        assert!(matches!(err, FanoutError::MissingPlaintext(_)));
    }

    #[tokio::test]
    async fn unknown_recipient_fails() {
        let s = setup(0).await;
        let resource = Uuid::new_v4();
        let work = [NeededSecret {
            user_id: Uuid::new_v4(),
            resource_id: resource,
        }];
        let plaintexts = HashMap::from([(resource, b"pw".to_vec())]);
        let err = encrypt_for_targets(&work, &plaintexts, &s.keyring, &AgeEngine::new(), &s.signer)
            .await
            .unwrap_err();
        assert!(matches!(err, FanoutError::MissingPublicKey(_)));
    }

    #[tokio::test]
    async fn duplicate_work_fails_whole_fanout() {
        let s = setup(1).await;
        let resource = Uuid::new_v4();
        let needed = NeededSecret {
            user_id: s.members[0].0,
            resource_id: resource,
        };
        let plaintexts = HashMap::from([(resource, b"pw".to_vec())]);
        let err = encrypt_for_targets(&[needed, needed], &plaintexts, &s.keyring, &AgeEngine::new(), &s.signer)
            .await
            .unwrap_err();
        match err {
            FanoutError::Collection(e) => assert_eq!(e.errors[0].index, Some(1)),
            other => panic!("unexpected error: {}", other),
        }
    }
}
