//! Versioned schema migrations tracked by `PRAGMA user_version`.

pub mod v001_initial;

use graft_core::errors::StorageError;
use rusqlite::Connection;

type Migration = fn(&Connection) -> Result<(), StorageError>;

const MIGRATIONS: &[(u32, Migration)] = &[(1, v001_initial::migrate)];

/// Latest schema version this build knows about.
pub const LATEST_VERSION: u32 = 1;

/// Bring the schema up to `LATEST_VERSION`. Already-applied versions are
/// skipped.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let current = current_version(conn)?;

    for &(version, migrate) in MIGRATIONS {
        if version <= current {
            continue;
        }
        migrate(conn).map_err(|e| StorageError::MigrationFailed {
            version,
            message: e.to_string(),
        })?;
        conn.pragma_update(None, "user_version", version)
            .map_err(|e| StorageError::MigrationFailed {
                version,
                message: e.to_string(),
            })?;
    }
    Ok(())
}

pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(crate::to_storage_err)
}
