use crate::api::{ApiError, ServerKeySource};
use crate::crypto::{Algorithm, KeyInfo, KeyParseError, KeyReader};
use crate::keys::{Keyring, KeyringError};

/// Minimum modulus size accepted for an organization recovery key.
pub const MIN_KEY_BITS: u32 = 4096;

#[derive(Debug, thiserror::Error)]
pub enum KeyValidationError {
    #[error("The key could not be read: {0}")]
    KeyParse(KeyParseError),
    #[error("The current organization recovery key could not be read: {0}")]
    CurrentKeyParse(KeyParseError),
    #[error("The key algorithm should be RSA.")]
    Algorithm,
    #[error("The key should be a public key.")]
    NotPublic,
    #[error("The key should not be revoked.")]
    Revoked,
    #[error("The key should not have an expiry date.")]
    Expires,
    #[error("The key should be at least {min_bits} bits.")]
    TooSmall { bits: u32, min_bits: u32 },
    #[error("The key is the current server key, the organization recovery key must be a new one.")]
    SameAsServerKey,
    #[error("The key is already being used by a member of the organization.")]
    UsedByMember,
    #[error("The key is the current organization recovery key, you must provide a new one.")]
    SameAsCurrentKey,
    #[error("could not fetch the server key: {0}")]
    ServerKey(#[source] ApiError),
    #[error("could not read the organization keyring: {0}")]
    Keyring(#[source] KeyringError),
}

/// Key properties required of an organization recovery key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPolicy {
    pub algorithm: Algorithm,
    pub min_bits: u32,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Rsa,
            min_bits: MIN_KEY_BITS,
        }
    }
}

impl KeyPolicy {
    /// Checks that only need the key itself, in order.
    pub fn check(&self, info: &KeyInfo) -> Result<(), KeyValidationError> {
        if info.algorithm != self.algorithm {
            return Err(KeyValidationError::Algorithm);
        }
        if info.is_private {
            return Err(KeyValidationError::NotPublic);
        }
        if info.revoked {
            return Err(KeyValidationError::Revoked);
        }
        if info.expires.is_some() {
            return Err(KeyValidationError::Expires);
        }
        if info.bits < self.min_bits {
            return Err(KeyValidationError::TooSmall {
                bits: info.bits,
                min_bits: self.min_bits,
            });
        }
        Ok(())
    }
}

/// Decides whether an armored key may become the organization recovery key.
pub struct OrganizationKeyValidator<'a> {
    reader: &'a dyn KeyReader,
    server_key: &'a dyn ServerKeySource,
    keyring: &'a dyn Keyring,
    policy: KeyPolicy,
}

impl<'a> OrganizationKeyValidator<'a> {
    pub fn new(
        reader: &'a dyn KeyReader,
        server_key: &'a dyn ServerKeySource,
        keyring: &'a dyn Keyring,
    ) -> Self {
        Self {
            reader,
            server_key,
            keyring,
            policy: KeyPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: KeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validate `candidate`, stopping at the first failed rule. Returns the
    /// candidate's metadata on success.
    pub async fn validate(
        &self,
        candidate: &str,
        current: Option<&str>,
    ) -> Result<KeyInfo, KeyValidationError> {
        let info = self
            .reader
            .read_key(candidate)
            .map_err(KeyValidationError::KeyParse)?;
        tracing::debug!("validating candidate key {}", info.fingerprint);

        self.policy.check(&info)?;

        let server_fingerprint = self
            .server_key
            .server_fingerprint()
            .await
            .map_err(KeyValidationError::ServerKey)?;
        if server_fingerprint.eq_ignore_ascii_case(&info.fingerprint) {
            return Err(KeyValidationError::SameAsServerKey);
        }

        self.keyring.sync().await.map_err(KeyValidationError::Keyring)?;
        let known = self
            .keyring
            .list_public()
            .await
            .map_err(KeyValidationError::Keyring)?;
        if let Some(owner) = known
            .iter()
            .find(|k| k.info.fingerprint.eq_ignore_ascii_case(&info.fingerprint))
        {
            tracing::debug!("candidate key belongs to user {}", owner.user_id);
            return Err(KeyValidationError::UsedByMember);
        }

        if let Some(current) = current {
            let current_info = self
                .reader
                .read_key(current)
                .map_err(KeyValidationError::CurrentKeyParse)?;
            if current_info.fingerprint.eq_ignore_ascii_case(&info.fingerprint) {
                return Err(KeyValidationError::SameAsCurrentKey);
            }
        }

        tracing::info!("organization recovery key {} is valid", info.fingerprint);
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StaticServerKey;
    use crate::crypto::openpgp::fixtures::*;
    use crate::crypto::OpenPgpReader;
    use crate::keys::{FileKeyring, KeyStore, UserIdentity};
    use tempfile::TempDir;
    use uuid::Uuid;

    struct Fixture {
        _dir: TempDir,
        reader: OpenPgpReader,
        server: StaticServerKey,
        keyring: FileKeyring,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let keyring = FileKeyring::offline(KeyStore::open_at(dir.path().to_path_buf()));
            Self {
                _dir: dir,
                reader: OpenPgpReader::new(),
                server: StaticServerKey("0000000000000000000000000000000000000000".to_string()),
                keyring,
            }
        }

        fn validator(&self) -> OrganizationKeyValidator<'_> {
            OrganizationKeyValidator::new(&self.reader, &self.server, &self.keyring)
        }
    }

    #[tokio::test]
    async fn accepts_fresh_rsa_key() {
        let fx = Fixture::new();
        let info = fx.validator().validate(RECOVERY_A, None).await.unwrap();
        assert_eq!(info.bits, 4096);
        assert_eq!(info.fingerprint, RECOVERY_A_FINGERPRINT);
    }

    #[tokio::test]
    async fn non_rsa_keys_fail_on_algorithm() {
        let fx = Fixture::new();
        let err = fx.validator().validate(ED25519, None).await.unwrap_err();
        assert!(matches!(err, KeyValidationError::Algorithm));
        assert_eq!(err.to_string(), "The key algorithm should be RSA.");
    }

    #[tokio::test]
    async fn user_bundles_are_not_organization_keys() {
        let fx = Fixture::new();
        let bundle = UserIdentity::generate().public_bundle("ed");
        let err = fx.validator().validate(&bundle, None).await.unwrap_err();
        assert!(matches!(
            err,
            KeyValidationError::KeyParse(KeyParseError::MissingArmor)
        ));
    }

    #[tokio::test]
    async fn garbage_fails_to_parse() {
        let fx = Fixture::new();
        let err = fx.validator().validate("hello", None).await.unwrap_err();
        assert!(matches!(err, KeyValidationError::KeyParse(_)));
    }

    #[tokio::test]
    async fn private_key_rejected() {
        let fx = Fixture::new();
        let err = fx
            .validator()
            .validate(RECOVERY_A_PRIVATE, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "The key should be a public key.");
    }

    #[tokio::test]
    async fn revoked_key_rejected() {
        let fx = Fixture::new();
        let err = fx.validator().validate(REVOKED, None).await.unwrap_err();
        assert_eq!(err.to_string(), "The key should not be revoked.");
    }

    #[tokio::test]
    async fn expiring_key_rejected() {
        let fx = Fixture::new();
        let err = fx.validator().validate(EXPIRING, None).await.unwrap_err();
        assert_eq!(err.to_string(), "The key should not have an expiry date.");
    }

    #[tokio::test]
    async fn small_key_rejected() {
        let fx = Fixture::new();
        let err = fx.validator().validate(RSA_2048, None).await.unwrap_err();
        assert!(matches!(err, KeyValidationError::TooSmall { bits: 2048, .. }));
        assert_eq!(err.to_string(), "The key should be at least 4096 bits.");
    }

    #[tokio::test]
    async fn server_key_rejected_even_when_otherwise_valid() {
        let mut fx = Fixture::new();
        fx.server = StaticServerKey(RECOVERY_A_FINGERPRINT.to_lowercase());
        let err = fx.validator().validate(RECOVERY_A, None).await.unwrap_err();
        assert!(matches!(err, KeyValidationError::SameAsServerKey));
    }

    #[tokio::test]
    async fn member_key_rejected() {
        let fx = Fixture::new();
        fx.keyring.import_public(RECOVERY_B, Uuid::new_v4()).await.unwrap();
        let err = fx.validator().validate(RECOVERY_B, None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "The key is already being used by a member of the organization."
        );
    }

    #[tokio::test]
    async fn current_key_rejected() {
        let fx = Fixture::new();
        let err = fx
            .validator()
            .validate(RECOVERY_A, Some(RECOVERY_A))
            .await
            .unwrap_err();
        assert!(matches!(err, KeyValidationError::SameAsCurrentKey));

        fx.validator()
            .validate(RECOVERY_A, Some(RECOVERY_B))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unreadable_current_key_is_reported() {
        let fx = Fixture::new();
        let err = fx
            .validator()
            .validate(RECOVERY_A, Some("not a key"))
            .await
            .unwrap_err();
        assert!(matches!(err, KeyValidationError::CurrentKeyParse(_)));
    }

    #[tokio::test]
    async fn validation_is_idempotent() {
        let fx = Fixture::new();
        for _ in 0..3 {
            assert!(fx.validator().validate(RECOVERY_A, None).await.is_ok());
            assert!(matches!(
                fx.validator().validate(RSA_2048, None).await,
                Err(KeyValidationError::TooSmall { .. })
            ));
        }
    }

    #[tokio::test]
    async fn custom_policy_relaxes_size() {
        let fx = Fixture::new();
        let policy = KeyPolicy {
            min_bits: 2048,
            ..KeyPolicy::default()
        };
        let info = fx
            .validator()
            .with_policy(policy)
            .validate(RSA_2048, None)
            .await
            .unwrap();
        assert_eq!(info.bits, 2048);
    }

    #[test]
    fn policy_order_reports_algorithm_first() {
        let info = KeyInfo {
            algorithm: Algorithm::X25519,
            bits: 256,
            fingerprint: "SHA256:x".to_string(),
            is_private: true,
            revoked: true,
            expires: None,
            created: None,
        };
        assert!(matches!(
            KeyPolicy::default().check(&info),
            Err(KeyValidationError::Algorithm)
        ));
    }
}
