use anyhow::Result;
use clap::Parser;

mod api;
mod cli;
mod config;
mod crypto;
mod entity;
mod group;
mod keys;
mod recovery;
mod ui;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else if args.quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let manifest = config::Manifest::load(args.config.as_deref())?;

    match args.command {
        cli::Command::Keys(args) => cli::keys::run(args, &manifest).await,
        cli::Command::OrgKey(args) => cli::org_key::run(args, &manifest).await,
        cli::Command::Group(args) => cli::group::run(args, &manifest).await,
        cli::Command::Completions { shell } => {
            let mut cmd = <cli::Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "rekey", &mut std::io::stdout());
            Ok(())
        }
    }
}
