pub mod group;
pub mod input;
pub mod keys;
pub mod org_key;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Manifest;
use crate::keys::KeyStore;

#[derive(Parser)]
#[command(
    name = "rekey",
    about = "Organization recovery key checks and group re-keying"
)]
#[command(version, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Show debug output (never prints secret values)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Minimal output (for scripting)
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Path to .rekey.toml manifest
    #[arg(long, global = true, env = "REKEY_CONFIG")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage your keypair and the keyring of other users' keys
    Keys(keys::KeysArgs),

    /// Check a candidate organization recovery key
    OrgKey(org_key::OrgKeyArgs),

    /// Compute group updates and encrypt secrets for new members
    Group(group::GroupArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Open the key store, honouring `[keys] dir` from the manifest.
pub fn open_store(manifest: &Manifest) -> Result<KeyStore> {
    KeyStore::open_or_default(manifest.keys.dir.as_deref())
}
