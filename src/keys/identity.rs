use anyhow::{bail, Context, Result};
use base64::Engine;
use ed25519_dalek::SigningKey;
use uuid::Uuid;

use age::secrecy::ExposeSecret;

use super::store::KeyStore;
use crate::crypto::key_info::{self, KeyInfo, KeyParseError, PUBLIC_FOOTER, PUBLIC_HEADER};

/// The acting user's key pair: age identity (decryption) + ed25519 key (signing).
pub struct UserIdentity {
    pub age_identity: age::x25519::Identity,
    pub age_recipient: age::x25519::Recipient,
    pub signing_key: SigningKey,
}

/// A user's public key bundle, as held in the keyring.
#[derive(Clone, Debug)]
pub struct PublicKey {
    pub user_id: Uuid,
    pub armored: String,
    pub info: KeyInfo,
    pub age_recipient: Option<age::x25519::Recipient>,
    pub verifying_key: Option<ed25519_dalek::VerifyingKey>,
}

impl UserIdentity {
    /// Generate a new keypair.
    pub fn generate() -> Self {
        let age_identity = age::x25519::Identity::generate();
        let age_recipient = age_identity.to_public();
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        Self {
            age_identity,
            age_recipient,
            signing_key,
        }
    }

    /// Load own identity from the key store.
    pub fn load(store: &KeyStore) -> Result<Self> {
        if !store.is_initialized() {
            bail!("no identity found. Run `rekey keys init` first.");
        }

        let age_key_str = std::fs::read_to_string(store.age_private_key_path())
            .context("failed to read age private key")?;
        let age_identity: age::x25519::Identity = age_key_str
            .trim()
            .parse()
            .map_err(|e: &str| anyhow::anyhow!("{}", e))?;
        let age_recipient = age_identity.to_public();

        let sign_key_b64 = std::fs::read_to_string(store.sign_private_key_path())
            .context("failed to read signing private key")?;
        let sign_key_bytes = base64::engine::general_purpose::STANDARD
            .decode(sign_key_b64.trim())
            .context("invalid base64 in signing private key")?;
        let sign_key_array: [u8; 32] = sign_key_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("invalid signing key length"))?;
        let signing_key = SigningKey::from_bytes(&sign_key_array);

        Ok(Self {
            age_identity,
            age_recipient,
            signing_key,
        })
    }

    /// Save this identity to the key store.
    pub fn save(&self, store: &KeyStore) -> Result<()> {
        store.ensure_dirs()?;

        let age_sk_str = self.age_identity.to_string();
        store.write_private(&store.age_private_key_path(), age_sk_str.expose_secret())?;

        store.write_private(
            &store.sign_private_key_path(),
            &base64::engine::general_purpose::STANDARD.encode(self.signing_key.to_bytes()),
        )?;

        std::fs::write(store.public_bundle_path(), self.public_bundle("self"))
            .context("failed to write public key bundle")?;

        Ok(())
    }

    fn sign_pubkey_b64(&self) -> String {
        base64::engine::general_purpose::STANDARD
            .encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Fingerprint of the public key bundle.
    pub fn fingerprint(&self) -> String {
        key_info::fingerprint_from_keys(&self.age_recipient.to_string(), &self.sign_pubkey_b64())
    }

    /// Armored public key bundle for sharing with the server and other users.
    pub fn public_bundle(&self, label: &str) -> String {
        format_public_bundle(
            label,
            &self.age_recipient.to_string(),
            &self.sign_pubkey_b64(),
        )
    }

    /// This identity's public half, attributed to `user_id`.
    pub fn to_public_key(&self, user_id: Uuid) -> PublicKey {
        PublicKey {
            user_id,
            armored: self.public_bundle("self"),
            info: KeyInfo {
                algorithm: key_info::Algorithm::X25519,
                bits: 256,
                fingerprint: self.fingerprint(),
                is_private: false,
                revoked: false,
                expires: None,
                created: None,
            },
            age_recipient: Some(self.age_recipient.clone()),
            verifying_key: Some(self.signing_key.verifying_key()),
        }
    }
}

impl PublicKey {
    /// Parse an armored bundle belonging to `user_id`.
    pub fn parse(user_id: Uuid, armored: &str) -> Result<Self, KeyParseError> {
        let parsed = key_info::read_key(armored)?;
        Ok(Self {
            user_id,
            armored: armored.to_string(),
            info: parsed.info,
            age_recipient: parsed.age_recipient,
            verifying_key: parsed.verifying_key,
        })
    }

    /// Load a user's public key from the store.
    pub fn load(store: &KeyStore, user_id: Uuid) -> Result<Self> {
        let path = store.public_key_path(user_id);
        if !path.exists() {
            bail!(
                "no public key found for user {}. Import with: rekey keys import <file> --user {}",
                user_id,
                user_id
            );
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(user_id, &content)
            .with_context(|| format!("invalid key bundle in {}", path.display()))
    }

    pub fn fingerprint(&self) -> &str {
        &self.info.fingerprint
    }
}

/// Format a public key bundle for export.
pub fn format_public_bundle(label: &str, age_pubkey: &str, sign_pubkey_b64: &str) -> String {
    let fingerprint = key_info::fingerprint_from_keys(age_pubkey, sign_pubkey_b64);
    format!(
        "{}\n# rekey public key for {}\n# fingerprint: {}\nage: {}\nsign: ed25519:{}\n{}\n",
        PUBLIC_HEADER, label, fingerprint, age_pubkey, sign_pubkey_b64, PUBLIC_FOOTER
    )
}
