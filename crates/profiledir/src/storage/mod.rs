//! Storage layer for profiledir.
//!
//! The profile collection is persisted as a single JSON array in one named
//! slot of a quota-limited key/value medium. The [`ProfileStore`] always
//! reads and writes the whole collection; there is no row-level access.

mod memory;
pub mod schema;
mod sqlite;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::profile::Profile;

pub use memory::MemoryMedium;
pub use sqlite::SqliteMedium;

/// Default name of the slot that holds the profile collection.
pub const DEFAULT_SLOT_KEY: &str = "detailedProfilesData";

/// Default medium quota: 5 MiB.
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// A persistence medium made of named text slots.
///
/// Writes are atomic per slot: a rejected or failed `set` leaves the slot's
/// previous value in place.
pub trait StorageMedium: Send + Sync + fmt::Debug {
    /// Read a slot, returning `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace a slot's value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CapacityExceeded`] if the write would push the
    /// medium past its quota, or another error if the write fails.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Read a slot and replace it as one atomic step.
    ///
    /// `f` receives the current value and returns the replacement, or `None`
    /// to leave the slot untouched. No other writer, in this process or
    /// another one sharing the medium, can change the slot in between.
    ///
    /// # Errors
    ///
    /// Returns any error from `f`, [`crate::Error::CapacityExceeded`] if the
    /// replacement does not fit, or another error if the write fails. The
    /// slot keeps its previous value in every error case.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<String>) -> Result<Option<String>>,
    ) -> Result<()>;

    /// Bytes currently held across all slots.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read.
    fn used_bytes(&self) -> Result<u64>;

    /// Maximum bytes the medium accepts.
    fn quota(&self) -> u64;
}

/// Durable holder of the profile collection.
///
/// Knows nothing about business rules; see
/// [`ProfileManager`](crate::lifecycle::ProfileManager) for those.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    medium: Arc<dyn StorageMedium>,
    key: String,
}

impl ProfileStore {
    /// Create a store over the given medium and slot name.
    #[must_use]
    pub fn new(medium: Arc<dyn StorageMedium>, key: impl Into<String>) -> Self {
        Self {
            medium,
            key: key.into(),
        }
    }

    /// Create a store using the default slot name.
    #[must_use]
    pub fn with_default_key(medium: Arc<dyn StorageMedium>) -> Self {
        Self::new(medium, DEFAULT_SLOT_KEY)
    }

    /// The slot this store reads and writes.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Maximum bytes the underlying medium accepts.
    #[must_use]
    pub fn quota(&self) -> u64 {
        self.medium.quota()
    }

    /// Load the persisted collection.
    ///
    /// An unwritten slot yields an empty collection. So does a slot whose
    /// content is not a valid profile array; that case is logged.
    ///
    /// # Errors
    ///
    /// Returns an error only if the medium itself cannot be read.
    pub fn load(&self) -> Result<Vec<Profile>> {
        Ok(self.parse(self.medium.get(&self.key)?))
    }

    fn parse(&self, raw: Option<String>) -> Vec<Profile> {
        let Some(raw) = raw else {
            debug!("Slot '{}' is empty", self.key);
            return Vec::new();
        };

        match serde_json::from_str::<Vec<Profile>>(&raw) {
            Ok(profiles) => {
                debug!("Loaded {} profiles from slot '{}'", profiles.len(), self.key);
                profiles
            }
            Err(e) => {
                warn!(
                    "Ignoring malformed profile data in slot '{}': {}",
                    self.key, e
                );
                Vec::new()
            }
        }
    }

    /// Load, change and save the collection as one atomic step.
    ///
    /// `f` edits the collection in place and returns `Some(value)` to commit
    /// it, or `None` to discard the edit and write nothing. Concurrent
    /// `modify` calls on the same medium, from any process, never interleave.
    ///
    /// # Errors
    ///
    /// Returns any error from `f` or from the medium, notably
    /// [`Error::CapacityExceeded`]. On error nothing is persisted.
    pub fn modify<T>(
        &self,
        f: impl FnOnce(&mut Vec<Profile>) -> Result<Option<T>>,
    ) -> Result<Option<T>> {
        let mut f = Some(f);
        let mut outcome = None;

        self.medium.update(&self.key, &mut |raw| {
            let f = f
                .take()
                .ok_or_else(|| Error::internal("collection edit ran twice"))?;
            let mut profiles = self.parse(raw);
            let Some(value) = f(&mut profiles)? else {
                return Ok(None);
            };
            outcome = Some(value);
            let raw = serde_json::to_string(&profiles)?;
            debug!(
                "Saving {} profiles ({} bytes) to slot '{}'",
                profiles.len(),
                raw.len(),
                self.key
            );
            Ok(Some(raw))
        })?;

        Ok(outcome)
    }

    /// Persist the full collection, replacing what was stored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CapacityExceeded`] if the medium rejects the
    /// write for size; the previous collection stays in place.
    pub fn save(&self, profiles: &[Profile]) -> Result<()> {
        let raw = serde_json::to_string(profiles)?;
        self.medium.set(&self.key, &raw)?;
        debug!(
            "Saved {} profiles ({} bytes) to slot '{}'",
            profiles.len(),
            raw.len(),
            self.key
        );
        Ok(())
    }

    /// Look up a profile by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read.
    pub fn find(&self, id: i64) -> Result<Option<Profile>> {
        Ok(self.load()?.into_iter().find(|p| p.id == id))
    }

    /// Get statistics about the stored collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read.
    pub fn stats(&self) -> Result<StorageStats> {
        let profiles = self.load()?;
        Ok(StorageStats {
            total_profiles: profiles.len(),
            documents_stored: profiles.iter().filter(|p| p.has_document()).count(),
            used_bytes: self.medium.used_bytes()?,
            quota_bytes: self.medium.quota(),
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of profiles in the collection.
    pub total_profiles: usize,
    /// Number of profiles with an embedded document.
    pub documents_stored: usize,
    /// Bytes used across the medium.
    pub used_bytes: u64,
    /// Medium quota in bytes.
    pub quota_bytes: u64,
}
