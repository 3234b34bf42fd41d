//! Queries for the state_cache table.

use graft_core::errors::StorageError;
use rusqlite::{params, Connection, OptionalExtension};

use crate::to_storage_err;

pub fn upsert(conn: &Connection, key: &str, value: &str) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO state_cache (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )
    .map_err(to_storage_err)?;
    Ok(())
}

pub fn get(conn: &Connection, key: &str) -> Result<Option<String>, StorageError> {
    conn.query_row(
        "SELECT value FROM state_cache WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(to_storage_err)
}

pub fn delete(conn: &Connection, key: &str) -> Result<(), StorageError> {
    conn.execute("DELETE FROM state_cache WHERE key = ?1", params![key])
        .map_err(to_storage_err)?;
    Ok(())
}
