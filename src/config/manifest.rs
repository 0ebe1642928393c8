use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use uuid::Uuid;

/// Project-level configuration from `.rekey.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub user: UserConfig,
    pub server: ServerConfig,
    pub keys: KeysConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// The acting user.
    pub id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server key fingerprint, used when validating keys offline.
    pub fingerprint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Overrides the platform config directory for the key store.
    pub dir: Option<PathBuf>,
}

impl Manifest {
    /// Try to load `.rekey.toml` from the given path or current dir.
    /// Returns default config if file doesn't exist.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = PathBuf::from(config_path.unwrap_or(".rekey.toml"));

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::from_file(&path)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let manifest: Manifest = toml::from_str(&content)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        let manifest = Manifest::load(path.to_str()).unwrap();
        assert!(manifest.user.id.is_none());
        assert!(manifest.keys.dir.is_none());
    }

    #[test]
    fn parses_all_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".rekey.toml");
        std::fs::write(
            &path,
            "[user]\nid = \"7c9e6679-7425-40de-944b-e07fc1f90ae7\"\n\
             [server]\nfingerprint = \"SHA256:abc\"\n\
             [keys]\ndir = \"/tmp/rekey\"\n",
        )
        .unwrap();

        let manifest = Manifest::load(path.to_str()).unwrap();
        assert_eq!(
            manifest.user.id.unwrap().to_string(),
            "7c9e6679-7425-40de-944b-e07fc1f90ae7"
        );
        assert_eq!(manifest.server.fingerprint.as_deref(), Some("SHA256:abc"));
        assert_eq!(manifest.keys.dir, Some(PathBuf::from("/tmp/rekey")));
    }

    #[test]
    fn partial_file_is_fine() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".rekey.toml");
        std::fs::write(&path, "[server]\nfingerprint = \"SHA256:abc\"\n").unwrap();
        let manifest = Manifest::load(path.to_str()).unwrap();
        assert!(manifest.user.id.is_none());
    }

    #[test]
    fn invalid_uuid_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".rekey.toml");
        std::fs::write(&path, "[user]\nid = \"nope\"\n").unwrap();
        assert!(Manifest::load(path.to_str()).is_err());
    }
}
