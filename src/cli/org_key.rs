use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use super::{input, open_store};
use crate::api::StaticServerKey;
use crate::config::Manifest;
use crate::crypto::OpenPgpReader;
use crate::keys::FileKeyring;
use crate::recovery::OrganizationKeyValidator;
use crate::ui::display;

#[derive(Args)]
pub struct OrgKeyArgs {
    #[command(subcommand)]
    pub command: OrgKeyCommand,
}

#[derive(Subcommand)]
pub enum OrgKeyCommand {
    /// Check that a key can become the organization recovery key
    Validate {
        /// Path to the candidate key (`-` for stdin)
        file: String,

        /// Path to the organization key currently in use
        #[arg(long)]
        current: Option<String>,

        /// Fingerprint of the server key (default: [server] fingerprint)
        #[arg(long)]
        server_fingerprint: Option<String>,
    },
}

pub async fn run(args: OrgKeyArgs, manifest: &Manifest) -> Result<()> {
    match args.command {
        OrgKeyCommand::Validate {
            file,
            current,
            server_fingerprint,
        } => cmd_validate(manifest, &file, current.as_deref(), server_fingerprint).await,
    }
}

async fn cmd_validate(
    manifest: &Manifest,
    file: &str,
    current: Option<&str>,
    server_fingerprint: Option<String>,
) -> Result<()> {
    let Some(server_fingerprint) =
        server_fingerprint.or_else(|| manifest.server.fingerprint.clone())
    else {
        bail!(
            "server key fingerprint unknown. Pass --server-fingerprint or set \
             [server] fingerprint in .rekey.toml"
        );
    };

    let candidate = input::read_source(file)?;
    let current = current.map(input::read_source).transpose()?;

    let reader = OpenPgpReader::new();
    let server_key = StaticServerKey(server_fingerprint);
    let keyring = FileKeyring::offline(open_store(manifest)?);
    let validator = OrganizationKeyValidator::new(&reader, &server_key, &keyring);

    let info = validator
        .validate(&candidate, current.as_deref())
        .await
        .with_context(|| format!("{} cannot be used as the organization recovery key", file))?;

    display::ok("key can be used as the organization recovery key");
    display::key_details(&info);

    Ok(())
}
