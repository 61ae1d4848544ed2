//! Error types for profiledir.
//!
//! This module defines all error types used throughout the profiledir crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for profiledir operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Persistence Errors ===
    /// The storage medium rejected a write because it would exceed its quota.
    #[error("storage capacity exceeded: write needs {required} bytes, quota is {quota} bytes")]
    CapacityExceeded {
        /// Total bytes the medium would hold after the write.
        required: u64,
        /// Configured quota in bytes.
        quota: u64,
    },

    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    // === Profile Errors ===
    /// No profile exists with the given id.
    #[error("profile {id} not found")]
    NotFound {
        /// The id that was looked up.
        id: i64,
    },

    // === Document Errors ===
    /// The raw document could not be read.
    #[error("failed to read document '{name}': {source}")]
    DocumentRead {
        /// File name of the document.
        name: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Stored document content is not a base64 data URL.
    #[error("invalid data URL: {message}")]
    InvalidDataUrl {
        /// Description of what is wrong with the content.
        message: String,
    },

    /// The profile has no stored document to extract.
    #[error("no document content was stored for profile {id}")]
    DocumentMissing {
        /// The profile id.
        id: i64,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// Writing command output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write an exported file.
    #[error("failed to write {path}: {source}")]
    FileWrite {
        /// Path that couldn't be written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for profiledir operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a not-found error for a profile id.
    #[must_use]
    pub fn not_found(id: i64) -> Self {
        Self::NotFound { id }
    }

    /// Create an invalid data URL error.
    #[must_use]
    pub fn invalid_data_url(message: impl Into<String>) -> Self {
        Self::InvalidDataUrl {
            message: message.into(),
        }
    }

    /// Create a document read error.
    #[must_use]
    pub fn document_read(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::DocumentRead {
            name: name.into(),
            source,
        }
    }

    /// Check if this error means the storage quota was exhausted.
    #[must_use]
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }

    /// Check if this error refers to a missing profile.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
