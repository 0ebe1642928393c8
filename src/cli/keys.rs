use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use super::{input, open_store};
use crate::config::Manifest;
use crate::keys::{FileKeyring, Keyring, PublicKey, UserIdentity};
use crate::ui::display;

#[derive(Parser)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub command: KeysCommand,
}

#[derive(Subcommand)]
pub enum KeysCommand {
    /// Generate your keypair
    Init,

    /// Print your public key bundle
    Export,

    /// Add a user's public key to the keyring
    Import {
        /// Path to a .pub file (`-` for stdin)
        file: String,

        /// Id of the user the key belongs to
        #[arg(long)]
        user: Uuid,

        /// Import without asking for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Show your key and the keyring
    List,

    /// Remove a user's key from the keyring
    Remove {
        /// User id
        user: Uuid,
    },

    /// Show your key fingerprint
    Fingerprint,
}

pub async fn run(args: KeysArgs, manifest: &Manifest) -> Result<()> {
    match args.command {
        KeysCommand::Init => cmd_init(manifest),
        KeysCommand::Export => cmd_export(manifest),
        KeysCommand::Import { file, user, yes } => cmd_import(manifest, &file, user, yes).await,
        KeysCommand::List => cmd_list(manifest).await,
        KeysCommand::Remove { user } => cmd_remove(manifest, user),
        KeysCommand::Fingerprint => cmd_fingerprint(manifest),
    }
}

fn cmd_init(manifest: &Manifest) -> Result<()> {
    let store = open_store(manifest)?;

    if store.is_initialized() {
        display::warning("keys already initialized. Use 'rekey keys export' to view your public key.");
        return Ok(());
    }

    let identity = UserIdentity::generate();
    identity.save(&store)?;

    display::ok("keypair generated");
    println!();
    println!("  fingerprint: {}", identity.fingerprint());
    println!("  keys stored in: {}", store.keys_dir().display());
    println!();
    println!("Publish your public key with: rekey keys export");

    Ok(())
}

fn cmd_export(manifest: &Manifest) -> Result<()> {
    let store = open_store(manifest)?;
    let identity = UserIdentity::load(&store)?;

    let label = match manifest.user.id {
        Some(id) => id.to_string(),
        None => username_or_unknown(),
    };
    print!("{}", identity.public_bundle(&label));

    Ok(())
}

async fn cmd_import(manifest: &Manifest, file: &str, user: Uuid, yes: bool) -> Result<()> {
    let content = input::read_source(file)?;

    let key = PublicKey::parse(user, &content)
        .with_context(|| format!("'{}' is not a valid key bundle", file))?;
    if key.info.is_private {
        bail!("'{}' holds a private key; only public keys can be imported", file);
    }

    println!("Importing public key:");
    println!("  user:        {}", user);
    println!("  algorithm:   {}", display::algorithm_label(&key.info));
    println!("  fingerprint: {}", key.fingerprint());
    println!();

    if !input::confirm("Trust this key?", yes)? {
        println!("import cancelled");
        return Ok(());
    }

    let keyring = FileKeyring::offline(open_store(manifest)?);
    keyring.import_public(&content, user).await?;

    display::ok(&format!("imported key for user {}", user));

    Ok(())
}

async fn cmd_list(manifest: &Manifest) -> Result<()> {
    let store = open_store(manifest)?;

    if store.is_initialized() {
        let identity = UserIdentity::load(&store)?;
        println!("Own key:");
        println!("  fingerprint: {}", identity.fingerprint());
        println!();
    }

    let users = store.list_users()?;
    if users.is_empty() {
        println!("Keyring is empty. Import with: rekey keys import <file> --user <uuid>");
        return Ok(());
    }

    let keyring = FileKeyring::offline(store);
    println!("Keyring:");
    for user in users {
        match keyring.find_public(user).await {
            Ok(Some(key)) => println!(
                "  {} ({}, {})",
                user,
                display::algorithm_label(&key.info),
                key.fingerprint()
            ),
            Ok(None) => {}
            Err(_) => println!("  {} (error reading key)", user),
        }
    }

    Ok(())
}

fn cmd_remove(manifest: &Manifest, user: Uuid) -> Result<()> {
    let keyring = FileKeyring::offline(open_store(manifest)?);

    if !keyring.remove(user)? {
        bail!("no key found for user {}", user);
    }
    display::ok(&format!("removed key of user {}", user));

    Ok(())
}

fn cmd_fingerprint(manifest: &Manifest) -> Result<()> {
    let store = open_store(manifest)?;
    let identity = UserIdentity::load(&store)?;
    println!("{}", identity.fingerprint());
    Ok(())
}

fn username_or_unknown() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
