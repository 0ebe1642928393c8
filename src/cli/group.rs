use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use console::style;

use super::{input, open_store};
use crate::config::Manifest;
use crate::crypto::AgeEngine;
use crate::entity::group::{Group, GroupUpdate, GroupUserChange};
use crate::group::prepare_payload;
use crate::keys::{FileKeyring, UserIdentity};
use crate::ui::display;

#[derive(Args)]
pub struct GroupArgs {
    #[command(subcommand)]
    pub command: GroupCommand,
}

#[derive(Subcommand)]
pub enum GroupCommand {
    /// Print the update between a group and its edited version
    Diff {
        /// The group as it is on the server (JSON)
        #[arg(long)]
        original: String,

        /// The edited group (JSON)
        #[arg(long)]
        updated: String,
    },

    /// Encrypt the secrets a dry-run asks for and print the final payload
    Prepare {
        /// The group update (JSON, as printed by `group diff`)
        #[arg(long)]
        update: String,

        /// The server's dry-run answer (JSON)
        #[arg(long)]
        dry_run: String,

        /// Write the payload to a file instead of stdout
        #[arg(long, short)]
        output: Option<String>,
    },
}

pub async fn run(args: GroupArgs, manifest: &Manifest) -> Result<()> {
    match args.command {
        GroupCommand::Diff { original, updated } => cmd_diff(&original, &updated),
        GroupCommand::Prepare {
            update,
            dry_run,
            output,
        } => cmd_prepare(manifest, &update, &dry_run, output.as_deref()).await,
    }
}

fn cmd_diff(original: &str, updated: &str) -> Result<()> {
    let before = Group::from_value(&input::read_json(original)?)
        .with_context(|| format!("invalid group in {}", original))?;
    let after = Group::from_value(&input::read_json(updated)?)
        .with_context(|| format!("invalid group in {}", updated))?;

    let update = GroupUpdate::from_groups_diff(&before, &after)?;

    if before.name != after.name {
        eprintln!("{} name: {} -> {}", style("~").yellow(), before.name, after.name);
    }
    for change in &update.groups_users {
        match change {
            GroupUserChange::Add { user_id, is_admin } => {
                eprintln!("{} {}{}", style("+").green(), user_id, admin_suffix(*is_admin))
            }
            GroupUserChange::Update { id, is_admin } => {
                eprintln!("{} {}{}", style("~").yellow(), id, admin_suffix(*is_admin))
            }
            GroupUserChange::Delete { id, .. } => eprintln!("{} {}", style("-").red(), id),
        }
    }
    if update.groups_users.is_empty() && before.name == after.name {
        eprintln!("no differences");
    }

    println!("{}", serde_json::to_string_pretty(&update)?);
    Ok(())
}

fn admin_suffix(is_admin: bool) -> &'static str {
    if is_admin {
        " (manager)"
    } else {
        ""
    }
}

async fn cmd_prepare(
    manifest: &Manifest,
    update: &str,
    dry_run: &str,
    output: Option<&str>,
) -> Result<()> {
    let group_update = GroupUpdate::from_value(&input::read_json(update)?)
        .with_context(|| format!("invalid group update in {}", update))?;
    let dry_run = input::read_json(dry_run)?;

    let store = open_store(manifest)?;
    let identity = UserIdentity::load(&store)?;
    let keyring = FileKeyring::offline(store);
    let engine = AgeEngine::new();

    let payload = prepare_payload(group_update, &dry_run, &keyring, &engine, &identity).await?;
    let shared = payload.secrets.as_ref().map_or(0, |s| s.len());
    let json = serde_json::to_string_pretty(&payload)?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("failed to write {}", path))?;
            display::ok(&format!("payload written to {} ({} secret(s))", path, shared));
        }
        None => println!("{}", json),
    }

    Ok(())
}
