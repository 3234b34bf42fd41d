//! v001: commit log, delivery log, state cache.

use graft_core::errors::StorageError;
use rusqlite::Connection;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    tracing::info!("v001: creating commit log tables");

    conn.execute_batch(
        "
        -- Commits a branch produced, one row per chunked payload.
        CREATE TABLE IF NOT EXISTS commit_log (
            seq       INTEGER PRIMARY KEY AUTOINCREMENT,
            branch_id TEXT NOT NULL,
            commit_id TEXT NOT NULL,
            part      INTEGER NOT NULL,
            payload   TEXT NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_commit_log_branch
            ON commit_log(branch_id, seq);

        -- Incoming commits received by a branch, possibly not merged yet.
        CREATE TABLE IF NOT EXISTS delivery_log (
            seq       INTEGER PRIMARY KEY AUTOINCREMENT,
            branch_id TEXT NOT NULL,
            commit_id TEXT NOT NULL,
            part      INTEGER NOT NULL,
            payload   TEXT NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_delivery_log_branch
            ON delivery_log(branch_id, seq);

        -- Recovery markers, keys namespaced by branch.
        CREATE TABLE IF NOT EXISTS state_cache (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        ) STRICT;
        ",
    )
    .map_err(to_storage_err)
}
