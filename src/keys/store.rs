use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use uuid::Uuid;

/// Manages the `~/.config/rekey/keys/` directory and file layout.
///
/// ```text
/// keys/
///   self.age.key      own age identity (0600)
///   self.sign.key     own ed25519 signing key (0600)
///   self.pub          own public key bundle
///   users/<uuid>.pub  keyring: other users' public key bundles
/// ```
pub struct KeyStore {
    base_dir: PathBuf,
}

impl KeyStore {
    /// Open the key store at the default platform config directory.
    pub fn open() -> Result<Self> {
        let dirs = ProjectDirs::from("dev", "rekey", "rekey")
            .context("could not determine config directory")?;
        let base_dir = dirs.config_dir().to_path_buf();
        Ok(Self { base_dir })
    }

    /// Open the key store at a specific directory.
    pub fn open_at(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Open at `dir` when given, at the platform default otherwise.
    pub fn open_or_default(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Ok(Self::open_at(dir.to_path_buf())),
            None => Self::open(),
        }
    }

    /// Ensure the key store directory structure exists.
    pub fn ensure_dirs(&self) -> Result<()> {
        let keys_dir = self.keys_dir();
        let users_dir = self.users_dir();
        std::fs::create_dir_all(&keys_dir)
            .with_context(|| format!("failed to create {}", keys_dir.display()))?;
        std::fs::create_dir_all(&users_dir)
            .with_context(|| format!("failed to create {}", users_dir.display()))?;
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.base_dir.join("keys")
    }

    pub fn users_dir(&self) -> PathBuf {
        self.keys_dir().join("users")
    }

    // --- Own key paths ---

    pub fn age_private_key_path(&self) -> PathBuf {
        self.keys_dir().join("self.age.key")
    }

    pub fn sign_private_key_path(&self) -> PathBuf {
        self.keys_dir().join("self.sign.key")
    }

    pub fn public_bundle_path(&self) -> PathBuf {
        self.keys_dir().join("self.pub")
    }

    // --- Keyring paths ---

    pub fn public_key_path(&self, user_id: Uuid) -> PathBuf {
        self.users_dir().join(format!("{}.pub", user_id))
    }

    /// Check whether own keys have been initialized.
    pub fn is_initialized(&self) -> bool {
        self.age_private_key_path().exists() && self.sign_private_key_path().exists()
    }

    /// List the users with a public key in the keyring.
    pub fn list_users(&self) -> Result<Vec<Uuid>> {
        let users_dir = self.users_dir();
        if !users_dir.exists() {
            return Ok(Vec::new());
        }
        let mut users = Vec::new();
        for entry in std::fs::read_dir(&users_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("pub") {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str());
            match stem.map(Uuid::parse_str) {
                Some(Ok(user_id)) => users.push(user_id),
                _ => tracing::debug!("skipping unexpected keyring file {}", path.display()),
            }
        }
        users.sort();
        Ok(users)
    }

    /// Write a file with restrictive permissions (0600) for private keys.
    pub fn write_private(&self, path: &Path, content: &str) -> Result<()> {
        std::fs::write(path, content)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}
