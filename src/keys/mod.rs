pub mod identity;
pub mod keyring;
pub mod store;

pub use identity::{PublicKey, UserIdentity};
pub use keyring::{FileKeyring, Keyring, KeyringError};
pub use store::KeyStore;
