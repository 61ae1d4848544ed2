//! `profiledir` - A local directory of personal profiles
//!
//! This library stores profile records, each with an optionally embedded
//! document, as one JSON collection in a quota-limited local slot store. The
//! [`ProfileManager`] enforces create/update/delete semantics on top of the
//! [`ProfileStore`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod logging;
pub mod profile;
pub mod storage;

pub use config::Config;
pub use document::{DataUrl, DocumentReader, FsDocumentReader, PreviewKind, RawFile};
pub use error::{Error, Result};
pub use ids::{ClockIdGenerator, IdGenerator, IdStrategy, SequentialIdGenerator};
pub use lifecycle::ProfileManager;
pub use logging::init_logging;
pub use profile::{FieldSet, Profile};
pub use storage::{MemoryMedium, ProfileStore, SqliteMedium, StorageMedium, StorageStats};
