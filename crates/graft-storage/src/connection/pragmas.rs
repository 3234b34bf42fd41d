//! PRAGMA configuration applied to every SQLite connection.
//!
//! WAL mode with FULL sync: an acknowledged append must survive a crash.

use graft_core::errors::StorageError;
use rusqlite::Connection;

use crate::to_storage_err;

pub fn apply_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = FULL;
        PRAGMA cache_size = -16000;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .map_err(to_storage_err)
}
