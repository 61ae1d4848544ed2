//! `SQLite`-backed slot store.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info, warn};

use super::schema::{SCHEMA_STATEMENTS, SELECT_USED_BYTES, SELECT_USED_BYTES_EXCLUDING};
use super::StorageMedium;
use crate::error::{Error, Result};

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// A quota-limited key/value store in an `SQLite` file.
///
/// Every write runs in an `IMMEDIATE` transaction, so it holds the database
/// write lock from the first read to the commit. Several processes may open
/// the same file; their writes queue up behind that lock.
#[derive(Debug)]
pub struct SqliteMedium {
    /// Database connection.
    conn: Mutex<Connection>,
    /// Maximum bytes across all keys and values.
    quota: u64,
}

impl SqliteMedium {
    /// Open or create a slot database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>, quota: u64) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(path).map_err(|source| Error::DatabaseOpen {
            path: path.to_path_buf(),
            source,
        })?;

        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            quota,
        })
    }

    /// Create an in-memory slot store.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory(quota: u64) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            quota,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    /// Check the quota and replace the slot. Must run inside a transaction.
    fn write_slot(&self, conn: &Connection, key: &str, value: &str) -> Result<()> {
        let others: i64 = conn.query_row(SELECT_USED_BYTES_EXCLUDING, [key], |row| row.get(0))?;
        let required = u64::try_from(others)
            .unwrap_or(0)
            .saturating_add(byte_len(key))
            .saturating_add(byte_len(value));

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

        conn.execute(
            "INSERT OR REPLACE INTO slots (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        debug!("Wrote {} bytes to slot '{}'", value.len(), key);
        Ok(())
    }
}

fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }
    Ok(())
}

fn read_slot(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM slots WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

fn byte_len(s: &str) -> u64 {
    u64::try_from(s.len()).unwrap_or(u64::MAX)
}

impl StorageMedium for SqliteMedium {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        read_slot(&conn, key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Dropping the transaction on error rolls it back.
        self.write_slot(&tx, key, value)?;
        tx.commit()?;
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<String>) -> Result<Option<String>>,
    ) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = read_slot(&tx, key)?;
        let Some(value) = f(current)? else {
            debug!("Slot '{}' left unchanged", key);
            return Ok(());
        };

        self.write_slot(&tx, key, &value)?;
        tx.commit()?;
        Ok(())
    }

    fn used_bytes(&self) -> Result<u64> {
        let conn = self.lock()?;
        let used: i64 = conn.query_row(SELECT_USED_BYTES, [], |row| row.get(0))?;
        Ok(u64::try_from(used).unwrap_or(0))
    }

    fn quota(&self) -> u64 {
        self.quota
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_medium(quota: u64) -> SqliteMedium {
        SqliteMedium::open_in_memory(quota).expect("failed to create test medium")
    }

    #[test]
    fn test_get_missing_slot() {
        let medium = create_test_medium(1024);
        assert!(medium.get("absent").unwrap().is_none());
    }

    #[test]
    fn test_set_and_get() {
        let medium = create_test_medium(1024);
        medium.set("profiles", "[]").unwrap();
        assert_eq!(medium.get("profiles").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_set_replaces_value() {
        let medium = create_test_medium(1024);
        medium.set("profiles", "[1]").unwrap();
        medium.set("profiles", "[1,2]").unwrap();
        assert_eq!(medium.get("profiles").unwrap().as_deref(), Some("[1,2]"));
        assert_eq!(medium.used_bytes().unwrap(), 8 + 5);
    }

    #[test]
    fn test_quota_counts_key_and_value() {
        let medium = create_test_medium(10);
        // 5 + 5 bytes fits exactly.
        medium.set("abcde", "12345").unwrap();
        let err = medium.set("abcde", "123456").unwrap_err();
        assert!(matches!(
            err,
            Error::CapacityExceeded {
                required: 11,
                quota: 10
            }
        ));
    }

    #[test]
    fn test_rejected_write_keeps_previous_value() {
        let medium = create_test_medium(32);
        medium.set("slot", "small").unwrap();

        let err = medium.set("slot", &"x".repeat(64)).unwrap_err();
        assert!(err.is_capacity_exceeded());
        assert_eq!(medium.get("slot").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn test_quota_includes_other_slots() {
        let medium = create_test_medium(20);
        medium.set("a", "123456789").unwrap(); // 10 bytes
        medium.set("b", "123456789").unwrap(); // 20 bytes total
        assert!(medium.set("c", "1").is_err());
        medium.set("a", "1").unwrap();
        medium.set("c", "1").unwrap();
        assert_eq!(medium.used_bytes().unwrap(), 14);
    }

    #[test]
    fn test_update_sees_current_value() {
        let medium = create_test_medium(64);
        medium.set("slot", "one").unwrap();

        let mut seen = None;
        medium
            .update("slot", &mut |current| {
                seen = current;
                Ok(Some("two".to_string()))
            })
            .unwrap();

        assert_eq!(seen.as_deref(), Some("one"));
        assert_eq!(medium.get("slot").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn test_update_returning_none_writes_nothing() {
        let medium = create_test_medium(64);
        medium.update("slot", &mut |_| Ok(None)).unwrap();
        assert!(medium.get("slot").unwrap().is_none());
        assert_eq!(medium.used_bytes().unwrap(), 0);
    }

    #[test]
    fn test_update_over_quota_keeps_previous_value() {
        let medium = create_test_medium(16);
        medium.set("k", "v").unwrap();

        let err = medium
            .update("k", &mut |_| Ok(Some("v".repeat(32))))
            .unwrap_err();
        assert!(err.is_capacity_exceeded());
        assert_eq!(medium.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_update_error_rolls_back() {
        let medium = create_test_medium(64);
        medium.set("k", "v").unwrap();

        let err = medium
            .update("k", &mut |_| Err(Error::internal("boom")))
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        assert_eq!(medium.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_update_is_atomic_across_connections() {
        let db_path = std::env::temp_dir().join(format!(
            "profiledir_sqlite_shared_{}.db",
            std::process::id()
        ));
        let first = SqliteMedium::open(&db_path, 1024).unwrap();
        first.set("counter", "0").unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = db_path.clone();
                std::thread::spawn(move || {
                    let medium = SqliteMedium::open(&path, 1024).unwrap();
                    for _ in 0..50 {
                        medium
                            .update("counter", &mut |current| {
                                let n: u64 = current.as_deref().unwrap_or("0").parse().unwrap();
                                Ok(Some((n + 1).to_string()))
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(first.get("counter").unwrap().as_deref(), Some("200"));

        drop(first);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_quota_accessor() {
        let medium = create_test_medium(4096);
        assert_eq!(medium.quota(), 4096);
    }

    #[test]
    fn test_open_file_based_persists() {
        let db_path = std::env::temp_dir().join(format!(
            "profiledir_sqlite_test_{}.db",
            std::process::id()
        ));

        {
            let medium = SqliteMedium::open(&db_path, 1024).unwrap();
            medium.set("profiles", r#"[{"id":1}]"#).unwrap();
        }

        let reopened = SqliteMedium::open(&db_path, 1024).unwrap();
        assert_eq!(
            reopened.get("profiles").unwrap().as_deref(),
            Some(r#"[{"id":1}]"#)
        );

        drop(reopened);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let nested_path = std::env::temp_dir().join(format!(
            "profiledir_test_{}/nested/profiles.db",
            std::process::id()
        ));

        if let Some(parent) = nested_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }

        let medium = SqliteMedium::open(&nested_path, 1024).unwrap();
        assert!(nested_path.exists());

        drop(medium);
        if let Some(parent) = nested_path.parent().and_then(Path::parent) {
            let _ = std::fs::remove_dir_all(parent);
        }
    }
}
