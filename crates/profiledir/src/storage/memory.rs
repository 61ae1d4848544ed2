//! In-process slot store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

use super::StorageMedium;
use crate::error::{Error, Result};

/// A quota-limited key/value store held in memory.
///
/// Nothing survives the process. Useful for tests and dry runs.
#[derive(Debug)]
pub struct MemoryMedium {
    slots: Mutex<HashMap<String, String>>,
    quota: u64,
}

impl MemoryMedium {
    /// Create an empty store with the given quota in bytes.
    #[must_use]
    pub fn new(quota: u64) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            quota,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.slots
            .lock()
            .map_err(|_| Error::internal("memory medium lock poisoned"))
    }

    fn write_slot(
        &self,
        slots: &mut HashMap<String, String>,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let others: u64 = slots
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| entry_len(k, v))
            .sum();
        let required = others.saturating_add(entry_len(key, value));

        if required > self.quota {
            warn!(
                "Rejected write to slot '{}': {} bytes exceeds quota of {}",
                key, required, self.quota
            );
            return Err(Error::CapacityExceeded {
                required,
                quota: self.quota,
            });
        }

        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn entry_len(key: &str, value: &str) -> u64 {
    u64::try_from(key.len() + value.len()).unwrap_or(u64::MAX)
}

impl StorageMedium for MemoryMedium {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.lock()?;
        self.write_slot(&mut slots, key, value)
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<String>) -> Result<Option<String>>,
    ) -> Result<()> {
        let mut slots = self.lock()?;
        match f(slots.get(key).cloned())? {
            Some(value) => self.write_slot(&mut slots, key, &value),
            None => Ok(()),
        }
    }

    fn used_bytes(&self) -> Result<u64> {
        Ok(self.lock()?.iter().map(|(k, v)| entry_len(k, v)).sum())
    }

    fn quota(&self) -> u64 {
        self.quota
    }
}
