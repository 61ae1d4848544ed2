//! Profile lifecycle management.
//!
//! [`ProfileManager`] enforces create/update/delete semantics on top of a
//! [`ProfileStore`]. A save runs in three steps:
//!
//! 1. **Gather**: check that an update targets an existing profile.
//! 2. **Resolve**: encode the uploaded file, if any. This is the only step
//!    that suspends, and it runs without holding the commit lock.
//! 3. **Commit**: in one atomic store transaction, reload the collection,
//!    merge the draft onto the prior record (or append a new one) and write
//!    the whole collection back.
//!
//! Because commit reloads inside the transaction, a delete or another save
//! that lands while a document is being encoded is never lost, even when it
//! comes from another process sharing the database.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::document::{DataUrl, DocumentReader, FsDocumentReader, RawFile};
use crate::error::{Error, Result};
use crate::ids::{ClockIdGenerator, IdGenerator};
use crate::profile::{FieldSet, Profile};
use crate::storage::{ProfileStore, SqliteMedium};

/// Orchestrates profile creation, update and deletion.
#[derive(Debug)]
pub struct ProfileManager {
    store: ProfileStore,
    ids: Arc<dyn IdGenerator>,
    reader: Arc<dyn DocumentReader>,
}

impl ProfileManager {
    /// Create a manager with explicit collaborators.
    #[must_use]
    pub fn new(
        store: ProfileStore,
        ids: Arc<dyn IdGenerator>,
        reader: Arc<dyn DocumentReader>,
    ) -> Self {
        Self {
            store,
            ids,
            reader,
        }
    }

    /// Create a manager using clock ids and the filesystem document reader.
    #[must_use]
    pub fn with_defaults(store: ProfileStore) -> Self {
        let reader = FsDocumentReader::with_limit(store.quota());
        Self::new(store, Arc::new(ClockIdGenerator::new()), Arc::new(reader))
    }

    /// Open the `SQLite`-backed directory described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn from_config(config: &Config) -> Result<Self> {
        let medium = SqliteMedium::open(config.database_path(), config.storage.quota_bytes)?;
        let store = ProfileStore::new(Arc::new(medium), config.storage.slot_key.clone());
        Ok(Self::new(
            store,
            config.ids.strategy.generator(),
            Arc::new(FsDocumentReader::with_limit(config.storage.quota_bytes)),
        ))
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Create a profile (`id` is `None`) or update an existing one.
    ///
    /// On update every text field is replaced by `fields`. The document file
    /// name and content are replaced only when `raw_file` is supplied;
    /// otherwise the stored document is kept as is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `id` does not match a stored profile,
    /// [`Error::DocumentRead`] if the file cannot be read, or any error from
    /// the store, notably [`Error::CapacityExceeded`]. On error nothing is
    /// persisted.
    pub async fn create_or_update(
        &self,
        id: Option<i64>,
        fields: FieldSet,
        raw_file: Option<RawFile>,
    ) -> Result<Profile> {
        if let Some(id) = id {
            if self.store.find(id)?.is_none() {
                return Err(Error::not_found(id));
            }
        }

        let document = match raw_file {
            Some(file) => {
                let content = self.reader.read_data_url(&file).await?;
                Some((file.name, content))
            }
            None => None,
        };

        let committed = self.store.modify(|profiles| {
            let profile = match id {
                Some(id) => {
                    let existing = profiles
                        .iter_mut()
                        .find(|p| p.id == id)
                        .ok_or_else(|| Error::not_found(id))?;
                    existing.apply_fields(fields);
                    if let Some((file_name, content)) = document {
                        existing.document_file_name = file_name;
                        existing.document_content = Some(content);
                    }
                    existing.clone()
                }
                None => {
                    let id = self.mint_id(profiles);
                    let (file_name, content) = split_document(document);
                    let created = Profile::new(id, fields, file_name, content);
                    profiles.push(created.clone());
                    created
                }
            };
            Ok(Some(profile))
        })?;
        let profile =
            committed.ok_or_else(|| Error::internal("profile save committed no record"))?;

        if id.is_some() {
            info!("Updated profile {} ({})", profile.id, profile.name);
        } else {
            info!("Created profile {} ({})", profile.id, profile.name);
        }
        Ok(profile)
    }

    /// Create a new profile.
    ///
    /// # Errors
    ///
    /// See [`ProfileManager::create_or_update`].
    pub async fn create(&self, fields: FieldSet, raw_file: Option<RawFile>) -> Result<Profile> {
        self.create_or_update(None, fields, raw_file).await
    }

    /// Update an existing profile.
    ///
    /// # Errors
    ///
    /// See [`ProfileManager::create_or_update`].
    pub async fn update(
        &self,
        id: i64,
        fields: FieldSet,
        raw_file: Option<RawFile>,
    ) -> Result<Profile> {
        self.create_or_update(Some(id), fields, raw_file).await
    }

    /// Delete a profile permanently.
    ///
    /// Returns `true` if a profile was removed. Deleting an absent id is a
    /// no-op and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let removed = self.store.modify(|profiles| {
            let before = profiles.len();
            profiles.retain(|p| p.id != id);
            Ok((profiles.len() < before).then_some(()))
        })?;

        if removed.is_none() {
            debug!("Delete of profile {} skipped: not found", id);
            return Ok(false);
        }
        info!("Deleted profile {}", id);
        Ok(true)
    }

    /// Look up a profile by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn find(&self, id: i64) -> Result<Option<Profile>> {
        self.store.find(id)
    }

    /// Look up a profile that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no profile has this id.
    pub fn get(&self, id: i64) -> Result<Profile> {
        self.find(id)?.ok_or_else(|| Error::not_found(id))
    }

    /// All profiles in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list(&self) -> Result<Vec<Profile>> {
        self.store.load()
    }

    /// Next id that no stored profile already uses.
    ///
    /// The generator is first moved past the highest stored id, so a fresh
    /// process never reissues ids below it.
    fn mint_id(&self, profiles: &[Profile]) -> i64 {
        if let Some(highest) = profiles.iter().map(|p| p.id).max() {
            self.ids.observe(highest);
        }
        loop {
            let id = self.ids.next_id();
            if profiles.iter().all(|p| p.id != id) {
                return id;
            }
            debug!("Skipping id {} already present in the collection", id);
        }
    }
}

fn split_document(document: Option<(String, DataUrl)>) -> (String, Option<DataUrl>) {
    match document {
        Some((file_name, content)) => (file_name, Some(content)),
        None => (String::new(), None),
    }
}
