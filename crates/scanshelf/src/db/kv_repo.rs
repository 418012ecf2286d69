//! Key-value repository: whole-value reads and writes on `kv_store`.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::{Database, DatabaseError};

/// Reads the value stored under `key`.
pub fn get(db: &Database, key: &str) -> Result<Option<Vec<u8>>, DatabaseError> {
    db.with_conn(|conn| {
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    })
}

/// Replaces the value under `key` in a single transaction. Either the new
/// value is committed or the previous one stays in place.
pub fn put(db: &Database, key: &str, value: &[u8]) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    })
}
