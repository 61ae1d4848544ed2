//! `SQLite` schema definitions for the slot store.
//!
//! The database mirrors a browser-style key/value store: every named slot
//! holds one text value.

/// SQL statement to create the slots table.
pub const CREATE_SLOTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS slots (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL query for the bytes held by every slot except the one being written.
pub const SELECT_USED_BYTES_EXCLUDING: &str = r"
SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0)
FROM slots WHERE key != ?1
";

/// SQL query for the bytes held by all slots.
pub const SELECT_USED_BYTES: &str = r"
SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0)
FROM slots
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_SLOTS_TABLE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_create_slots_table_structure() {
        assert!(CREATE_SLOTS_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_SLOTS_TABLE.contains("value TEXT NOT NULL"));
    }

    #[test]
    fn test_schema_applies_to_fresh_database() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        for stmt in SCHEMA_STATEMENTS {
            conn.execute(stmt, []).unwrap();
        }
        // Idempotent on a second run.
        for stmt in SCHEMA_STATEMENTS {
            conn.execute(stmt, []).unwrap();
        }
        let used: i64 = conn.query_row(SELECT_USED_BYTES, [], |row| row.get(0)).unwrap();
        assert_eq!(used, 0);
    }
}
