//! # graft-storage
//!
//! Durable backends for the branch engine: an append-only commit log and a
//! small key-value cache for recovery markers.
//!
//! The SQLite log stores commits as size-bounded payloads produced by the
//! commit splitter and regroups them on load. In-memory implementations with
//! fault injection back the engine's tests.

pub mod chunking;
pub mod connection;
pub mod memory;
pub mod migrations;
pub mod queries;
pub mod sqlite_cache;
pub mod sqlite_log;

pub use chunking::{CommitAssembler, CommitPayload, CommitSplitter};
pub use connection::DatabaseManager;
pub use memory::{MemoryCache, MemoryLog};
pub use sqlite_cache::SqliteStateCache;
pub use sqlite_log::SqliteCommitLog;

use graft_core::errors::StorageError;
use graft_core::{Commit, CommitId};

pub(crate) fn to_storage_err(err: impl std::fmt::Display) -> StorageError {
    StorageError::SqliteError {
        message: err.to_string(),
    }
}

/// Commits strictly after the last occurrence of `after`. `None`, or an id
/// that never occurs, yields everything.
pub(crate) fn suffix_after(commits: Vec<Commit>, after: Option<&CommitId>) -> Vec<Commit> {
    let Some(after) = after else {
        return commits;
    };
    match commits.iter().rposition(|c| c.id() == after) {
        Some(pos) => commits.into_iter().skip(pos + 1).collect(),
        None => commits,
    }
}
