//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::document::RawFile;
use crate::profile::{FieldSet, Profile};

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Profile id
    pub id: i64,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Create command arguments.
#[derive(Debug, Args)]
pub struct CreateCommand {
    /// Full name
    #[arg(long)]
    pub name: String,

    /// Email address
    #[arg(long)]
    pub email: String,

    /// Date of birth
    #[arg(long, default_value = "")]
    pub dob: String,

    /// Postal address
    #[arg(long, default_value = "")]
    pub address: String,

    /// Kind of document (e.g. "Passport")
    #[arg(long, default_value = "")]
    pub document_name: String,

    /// Document to embed in the profile
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

impl CreateCommand {
    /// Field values for the new profile.
    #[must_use]
    pub fn fields(&self) -> FieldSet {
        FieldSet::new(&self.name, &self.email)
            .with_dob(&self.dob)
            .with_address(&self.address)
            .with_document_name(&self.document_name)
    }

    /// The document to embed, if one was given.
    #[must_use]
    pub fn raw_file(&self) -> Option<RawFile> {
        self.file.as_ref().map(RawFile::from_path)
    }
}

/// Update command arguments.
///
/// Fields left out keep their stored values.
#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Profile id
    pub id: i64,

    /// Full name
    #[arg(long)]
    pub name: Option<String>,

    /// Email address
    #[arg(long)]
    pub email: Option<String>,

    /// Date of birth
    #[arg(long)]
    pub dob: Option<String>,

    /// Postal address
    #[arg(long)]
    pub address: Option<String>,

    /// Kind of document
    #[arg(long)]
    pub document_name: Option<String>,

    /// Replacement document
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

impl UpdateCommand {
    /// Field values for the update, starting from the stored profile.
    #[must_use]
    pub fn fields(&self, current: &Profile) -> FieldSet {
        let mut fields = FieldSet::from(current);
        if let Some(name) = &self.name {
            fields.name.clone_from(name);
        }
        if let Some(email) = &self.email {
            fields.email.clone_from(email);
        }
        if let Some(dob) = &self.dob {
            fields.dob.clone_from(dob);
        }
        if let Some(address) = &self.address {
            fields.address.clone_from(address);
        }
        if let Some(document_name) = &self.document_name {
            fields.document_name.clone_from(document_name);
        }
        fields
    }

    /// The replacement document, if one was given.
    #[must_use]
    pub fn raw_file(&self) -> Option<RawFile> {
        self.file.as_ref().map(RawFile::from_path)
    }
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Profile id
    pub id: i64,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Profile id
    pub id: i64,

    /// Output file (defaults to `<Name>_Profile.json`)
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

/// Document command arguments.
#[derive(Debug, Args)]
pub struct DocumentCommand {
    /// Profile id
    pub id: i64,

    /// Output file (defaults to the original file name)
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
