//! Command-line interface for profiledir.
//!
//! This module provides the CLI structure for the `profiledir` binary and
//! the [`handlers`] that render what the lifecycle manager returns. The
//! binary never touches storage directly.

mod commands;
pub mod handlers;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, CreateCommand, DeleteCommand, DocumentCommand, ExportCommand, ListCommand,
    ShowCommand, StatusCommand, UpdateCommand,
};

use crate::logging::Verbosity;

/// profiledir - A local directory of personal profiles
///
/// Stores profile records and their supporting documents in a single local
/// database, with no server component.
#[derive(Debug, Parser)]
#[command(name = "profiledir")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List all profiles
    List(ListCommand),

    /// Show one profile in detail
    Show(ShowCommand),

    /// Create a profile
    Create(CreateCommand),

    /// Update a profile
    Update(UpdateCommand),

    /// Delete a profile permanently
    Delete(DeleteCommand),

    /// Write a profile's data as JSON
    Export(ExportCommand),

    /// Write a profile's stored document back to disk
    Document(DocumentCommand),

    /// Show storage usage
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
