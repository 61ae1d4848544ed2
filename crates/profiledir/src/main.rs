//! `profiledir` - CLI for the local profile directory
//!
//! This binary is the presentation layer over the profiledir library: it
//! renders profiles and forwards user actions to the lifecycle manager.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Write;

use anyhow::Context;
use clap::Parser;

use profiledir::cli::handlers::{self, capacity_hint};
use profiledir::cli::{Cli, Command};
use profiledir::{init_logging, Config, Error, ProfileManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    let result = run(cli.command, &config, &mut std::io::stdout()).await;

    if let Err(err) = &result {
        if let Some(hint) = err.downcast_ref::<Error>().and_then(capacity_hint) {
            eprintln!("{hint}");
        }
    }
    result
}

async fn run(command: Command, config: &Config, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Config(cmd) => handlers::config(config, cmd, out)?,
        Command::List(cmd) => handlers::list(&open(config)?, cmd.json, out)?,
        Command::Show(cmd) => handlers::show(&open(config)?, cmd.id, cmd.json, out)?,
        Command::Create(cmd) => {
            handlers::create(&open(config)?, &cmd, out).await?;
        }
        Command::Update(cmd) => {
            handlers::update(&open(config)?, &cmd, out).await?;
        }
        Command::Delete(cmd) => handlers::delete(&open(config)?, &cmd, out).await?,
        Command::Export(cmd) => {
            handlers::export(&open(config)?, &cmd, out)?;
        }
        Command::Document(cmd) => {
            handlers::document(&open(config)?, &cmd, out)?;
        }
        Command::Status(cmd) => {
            handlers::status(&open(config)?, &config.database_path(), cmd.json, out)?;
        }
    }
    Ok(())
}

fn open(config: &Config) -> anyhow::Result<ProfileManager> {
    ProfileManager::from_config(config)
        .with_context(|| format!("failed to open {}", config.database_path().display()))
}
