use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::identity::PublicKey;
use super::store::KeyStore;
use crate::api::{gpgkeys, ApiClient, ApiError};
use crate::crypto::KeyParseError;

#[derive(Debug, thiserror::Error)]
pub enum KeyringError {
    #[error("keyring I/O error: {0}")]
    Io(String),
    #[error("invalid key for user {user_id}: {source}")]
    InvalidKey {
        user_id: Uuid,
        #[source]
        source: KeyParseError,
    },
    #[error("the key for user {0} is a private key")]
    NotPublic(Uuid),
    #[error("could not sync keyring: {0}")]
    Api(#[from] ApiError),
}

/// Public keys of other users, indexed by user id.
#[async_trait]
pub trait Keyring: Send + Sync {
    async fn find_public(&self, user_id: Uuid) -> Result<Option<PublicKey>, KeyringError>;

    /// Store `armored` as the key of `user_id`. Importing the same key twice
    /// leaves a single entry.
    async fn import_public(&self, armored: &str, user_id: Uuid) -> Result<PublicKey, KeyringError>;

    /// Pull every user key from the server. Keys the server marks deleted
    /// are dropped locally. Returns the number of keys that were added,
    /// replaced or removed.
    async fn sync(&self) -> Result<usize, KeyringError>;

    async fn list_public(&self) -> Result<Vec<PublicKey>, KeyringError>;
}

/// Keyring kept as `<uuid>.pub` files in the key store.
pub struct FileKeyring {
    store: KeyStore,
    api: Option<Arc<dyn ApiClient>>,
}

impl FileKeyring {
    /// A keyring that only knows what has been imported locally.
    pub fn offline(store: KeyStore) -> Self {
        Self { store, api: None }
    }

    pub fn with_api(store: KeyStore, api: Arc<dyn ApiClient>) -> Self {
        Self {
            store,
            api: Some(api),
        }
    }

    pub fn store(&self) -> &KeyStore {
        &self.store
    }

    /// Remove a user's key. Returns false if there was none.
    pub fn remove(&self, user_id: Uuid) -> Result<bool, KeyringError> {
        let path = self.store.public_key_path(user_id);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path).map_err(|e| io_error("remove", &path, e))?;
        Ok(true)
    }

    fn read(&self, user_id: Uuid) -> Result<Option<PublicKey>, KeyringError> {
        let path = self.store.public_key_path(user_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| io_error("read", &path, e))?;
        PublicKey::parse(user_id, &content)
            .map(Some)
            .map_err(|source| KeyringError::InvalidKey { user_id, source })
    }

    /// Returns true when the stored key changed.
    fn write(&self, key: &PublicKey) -> Result<bool, KeyringError> {
        let existing = match self.read(key.user_id) {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!("overwriting unreadable key of user {}: {}", key.user_id, e);
                None
            }
        };
        if let Some(existing) = existing {
            if existing.fingerprint() == key.fingerprint() {
                return Ok(false);
            }
            tracing::debug!(
                "replacing key of user {} ({} -> {})",
                key.user_id,
                existing.fingerprint(),
                key.fingerprint()
            );
        }
        self.store
            .ensure_dirs()
            .map_err(|e| KeyringError::Io(format!("{:#}", e)))?;
        let path = self.store.public_key_path(key.user_id);
        std::fs::write(&path, &key.armored).map_err(|e| io_error("write", &path, e))?;
        Ok(true)
    }
}

fn io_error(action: &str, path: &std::path::Path, e: std::io::Error) -> KeyringError {
    KeyringError::Io(format!("failed to {} {}: {}", action, path.display(), e))
}

fn parse_public(armored: &str, user_id: Uuid) -> Result<PublicKey, KeyringError> {
    let key = PublicKey::parse(user_id, armored)
        .map_err(|source| KeyringError::InvalidKey { user_id, source })?;
    if key.info.is_private {
        return Err(KeyringError::NotPublic(user_id));
    }
    Ok(key)
}

#[async_trait]
impl Keyring for FileKeyring {
    async fn find_public(&self, user_id: Uuid) -> Result<Option<PublicKey>, KeyringError> {
        self.read(user_id)
    }

    async fn import_public(&self, armored: &str, user_id: Uuid) -> Result<PublicKey, KeyringError> {
        let key = parse_public(armored, user_id)?;
        self.write(&key)?;
        Ok(key)
    }

    async fn sync(&self) -> Result<usize, KeyringError> {
        let Some(api) = &self.api else {
            tracing::debug!("no API client configured, keyring sync skipped");
            return Ok(0);
        };

        let keys = gpgkeys::find_all(api.as_ref()).await?;
        let mut changed = 0;
        for gpgkey in &keys {
            if gpgkey.deleted {
                if self.remove(gpgkey.user_id)? {
                    tracing::debug!("removed deleted key of user {}", gpgkey.user_id);
                    changed += 1;
                }
                continue;
            }
            let key = match parse_public(&gpgkey.armored_key, gpgkey.user_id) {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!("ignoring server key: {}", e);
                    continue;
                }
            };
            if self.write(&key)? {
                changed += 1;
            }
        }
        tracing::info!("keyring synced: {} key(s) fetched, {} updated", keys.len(), changed);
        Ok(changed)
    }

    async fn list_public(&self) -> Result<Vec<PublicKey>, KeyringError> {
        let users = self
            .store
            .list_users()
            .map_err(|e| KeyringError::Io(format!("{:#}", e)))?;
        let mut keys = Vec::with_capacity(users.len());
        for user_id in users {
            if let Some(key) = self.read(user_id)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}
