pub mod age_engine;
pub mod key_info;
pub mod openpgp;

use crate::keys::identity::{PublicKey, UserIdentity};

pub use age_engine::AgeEngine;
pub use key_info::{Algorithm, KeyInfo, KeyParseError};
pub use openpgp::OpenPgpReader;

/// Errors from the encryption capability.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encrypt(String),
    #[error("decryption failed: {0}")]
    Decrypt(String),
    #[error("recipient key cannot be used: {0}")]
    UnusableRecipient(String),
    #[error("signature verification failed: {0}")]
    Signature(String),
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Reads key metadata out of an armored key.
pub trait KeyReader: Send + Sync {
    fn read_key(&self, armored: &str) -> Result<KeyInfo, KeyParseError>;
}

/// Asymmetric encryption for a single recipient, signed by the sender.
pub trait Cipher: Send + Sync {
    /// Encrypt `plaintext` for `recipient` and sign it with `signer`.
    /// Returns an armored message.
    fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &PublicKey,
        signer: &UserIdentity,
    ) -> Result<String, CryptoError>;

    /// Decrypt an armored message. When `signer` is given the signature
    /// must verify against it.
    fn decrypt(
        &self,
        message: &str,
        identity: &UserIdentity,
        signer: Option<&PublicKey>,
    ) -> Result<Vec<u8>, CryptoError>;
}
