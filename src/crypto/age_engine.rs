use std::io::{Read, Write};

use age::armor::{ArmoredReader, ArmoredWriter, Format};
use base64::Engine;
use chrono::Utc;
use ed25519_dalek::{Signature, Signer, Verifier};
use serde::{Deserialize, Serialize};

use super::key_info::{self, KeyInfo, KeyParseError};
use super::{Cipher, CryptoError, KeyReader};
use crate::keys::identity::{PublicKey, UserIdentity};

/// Signed plaintext carried inside the age ciphertext.
#[derive(Debug, Serialize, Deserialize)]
struct SignedPlaintext {
    /// Base64 plaintext.
    data: String,
    /// Fingerprint of the signer's key bundle.
    signer: String,
    /// Ed25519 signature over the raw plaintext (base64).
    signature: String,
}

/// Crypto engine backed by age (X25519) and ed25519 signatures.
#[derive(Debug, Default, Clone, Copy)]
pub struct AgeEngine;

impl AgeEngine {
    pub fn new() -> Self {
        Self
    }
}

impl KeyReader for AgeEngine {
    fn read_key(&self, armored: &str) -> Result<KeyInfo, KeyParseError> {
        key_info::read_key(armored).map(|parsed| parsed.info)
    }
}

impl Cipher for AgeEngine {
    fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &PublicKey,
        signer: &UserIdentity,
    ) -> Result<String, CryptoError> {
        let age_recipient = usable_recipient(recipient)?;

        let signature = signer.signing_key.sign(plaintext);
        let inner = SignedPlaintext {
            data: base64::engine::general_purpose::STANDARD.encode(plaintext),
            signer: signer.fingerprint(),
            signature: base64::engine::general_purpose::STANDARD.encode(signature.to_bytes()),
        };
        let inner_bytes = serde_json::to_vec(&inner)
            .map_err(|e| CryptoError::Encrypt(format!("failed to serialize payload: {}", e)))?;

        age_encrypt_armored(&inner_bytes, age_recipient)
    }

    fn decrypt(
        &self,
        message: &str,
        identity: &UserIdentity,
        signer: Option<&PublicKey>,
    ) -> Result<Vec<u8>, CryptoError> {
        let inner_bytes = age_decrypt_armored(message, &identity.age_identity)?;
        let inner: SignedPlaintext = serde_json::from_slice(&inner_bytes)
            .map_err(|e| CryptoError::Malformed(format!("invalid inner payload: {}", e)))?;

        let plaintext = base64::engine::general_purpose::STANDARD
            .decode(&inner.data)
            .map_err(|e| CryptoError::Malformed(format!("invalid base64 payload: {}", e)))?;

        if let Some(expected) = signer {
            verify_signature(&inner, &plaintext, expected)?;
        }

        Ok(plaintext)
    }
}

/// Reject keys that cannot receive a new message.
fn usable_recipient(recipient: &PublicKey) -> Result<&age::x25519::Recipient, CryptoError> {
    if recipient.info.revoked {
        return Err(CryptoError::UnusableRecipient(format!(
            "the key of user {} is revoked",
            recipient.user_id
        )));
    }
    if let Some(expires) = recipient.info.expires {
        if expires <= Utc::now() {
            return Err(CryptoError::UnusableRecipient(format!(
                "the key of user {} expired on {}",
                recipient.user_id, expires
            )));
        }
    }
    recipient.age_recipient.as_ref().ok_or_else(|| {
        CryptoError::UnusableRecipient(format!(
            "the {} key of user {} cannot be used for encryption",
            recipient.info.algorithm, recipient.user_id
        ))
    })
}

fn verify_signature(
    inner: &SignedPlaintext,
    plaintext: &[u8],
    expected: &PublicKey,
) -> Result<(), CryptoError> {
    let verifying_key = expected.verifying_key.as_ref().ok_or_else(|| {
        CryptoError::Signature(format!("user {} has no signing key", expected.user_id))
    })?;
    if inner.signer != expected.info.fingerprint {
        return Err(CryptoError::Signature(format!(
            "message was signed by {}, expected {}",
            inner.signer, expected.info.fingerprint
        )));
    }

    let sig_bytes = base64::engine::general_purpose::STANDARD
        .decode(&inner.signature)
        .map_err(|_| CryptoError::Signature("invalid signature encoding".to_string()))?;
    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| CryptoError::Signature("invalid signature length".to_string()))?;
    let signature = Signature::from_bytes(&sig_array);

    verifying_key
        .verify(plaintext, &signature)
        .map_err(|_| CryptoError::Signature("payload may be tampered".to_string()))
}

fn age_encrypt_armored(data: &[u8], recipient: &age::x25519::Recipient) -> Result<String, CryptoError> {
    let encryptor =
        age::Encryptor::with_recipients(std::iter::once(recipient as &dyn age::Recipient))
            .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

    let mut encrypted = vec![];
    let armor = ArmoredWriter::wrap_output(&mut encrypted, Format::AsciiArmor)
        .map_err(|e| CryptoError::Encrypt(format!("failed to create armor writer: {}", e)))?;
    let mut writer = encryptor
        .wrap_output(armor)
        .map_err(|e| CryptoError::Encrypt(format!("failed to create age encryptor: {}", e)))?;

    writer
        .write_all(data)
        .map_err(|e| CryptoError::Encrypt(format!("failed to write age ciphertext: {}", e)))?;
    writer
        .finish()
        .and_then(|armor| armor.finish())
        .map_err(|e| CryptoError::Encrypt(format!("failed to finalize age encryption: {}", e)))?;

    String::from_utf8(encrypted).map_err(|e| CryptoError::Encrypt(e.to_string()))
}

fn age_decrypt_armored(message: &str, identity: &age::x25519::Identity) -> Result<Vec<u8>, CryptoError> {
    let decryptor = age::Decryptor::new(ArmoredReader::new(message.as_bytes()))
        .map_err(|e| CryptoError::Decrypt(format!("failed to read age header: {}", e)))?;

    let mut reader = decryptor
        .decrypt(std::iter::once(identity as &dyn age::Identity))
        .map_err(|e| CryptoError::Decrypt(e.to_string()))?;

    let mut plaintext = vec![];
    reader
        .read_to_end(&mut plaintext)
        .map_err(|e| CryptoError::Decrypt(format!("failed to read decrypted data: {}", e)))?;

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn public_key_of(identity: &UserIdentity) -> PublicKey {
        PublicKey::parse(Uuid::new_v4(), &identity.public_bundle("test")).unwrap()
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let engine = AgeEngine::new();
        let sender = UserIdentity::generate();
        let receiver = UserIdentity::generate();

        let message = engine
            .encrypt(b"resource1-password", &public_key_of(&receiver), &sender)
            .unwrap();
        assert!(message.starts_with("-----BEGIN AGE ENCRYPTED FILE-----"));

        let plaintext = engine
            .decrypt(&message, &receiver, Some(&public_key_of(&sender)))
            .unwrap();
        assert_eq!(plaintext, b"resource1-password");
    }

    #[test]
    fn wrong_recipient_cannot_decrypt() {
        let engine = AgeEngine::new();
        let sender = UserIdentity::generate();
        let receiver = UserIdentity::generate();
        let other = UserIdentity::generate();

        let message = engine
            .encrypt(b"secret", &public_key_of(&receiver), &sender)
            .unwrap();
        assert!(matches!(
            engine.decrypt(&message, &other, None),
            Err(CryptoError::Decrypt(_))
        ));
    }

    #[test]
    fn signer_mismatch_rejected() {
        let engine = AgeEngine::new();
        let sender = UserIdentity::generate();
        let impostor = UserIdentity::generate();
        let receiver = UserIdentity::generate();

        let message = engine
            .encrypt(b"secret", &public_key_of(&receiver), &sender)
            .unwrap();
        assert!(matches!(
            engine.decrypt(&message, &receiver, Some(&public_key_of(&impostor))),
            Err(CryptoError::Signature(_))
        ));
    }

    #[test]
    fn openpgp_recipient_is_unusable() {
        let engine = AgeEngine::new();
        let sender = UserIdentity::generate();
        let rsa_key = PublicKey::parse(
            Uuid::new_v4(),
            crate::crypto::openpgp::fixtures::RECOVERY_B,
        )
        .unwrap();

        assert!(matches!(
            engine.encrypt(b"secret", &rsa_key, &sender),
            Err(CryptoError::UnusableRecipient(_))
        ));
    }

    #[test]
    fn revoked_recipient_is_unusable() {
        let engine = AgeEngine::new();
        let sender = UserIdentity::generate();
        let receiver = UserIdentity::generate();
        let mut key = public_key_of(&receiver);
        key.info.revoked = true;

        assert!(matches!(
            engine.encrypt(b"secret", &key, &sender),
            Err(CryptoError::UnusableRecipient(_))
        ));
    }

    #[test]
    fn reads_key_metadata() {
        let identity = UserIdentity::generate();
        let info = AgeEngine::new()
            .read_key(&identity.public_bundle("alice"))
            .unwrap();
        assert_eq!(info.fingerprint, identity.fingerprint());
        assert!(!info.is_private);
    }
}
