//! SQLite-backed durable commit log.

use std::sync::Arc;

use graft_core::config::ChunkingConfig;
use graft_core::errors::StorageError;
use graft_core::traits::DurableLog;
use graft_core::{BranchId, Commit, CommitId};

use crate::chunking::{CommitAssembler, CommitPayload, CommitSplitter};
use crate::connection::writer::with_immediate_transaction;
use crate::connection::DatabaseManager;
use crate::queries::commit_log::{self, LogTable};

/// Stores each commit as one or more chunked payload rows, written in a
/// single transaction so a commit is either fully logged or not at all.
pub struct SqliteCommitLog {
    db: Arc<DatabaseManager>,
    splitter: CommitSplitter,
}

impl SqliteCommitLog {
    pub fn new(db: Arc<DatabaseManager>, chunking: &ChunkingConfig) -> Self {
        Self {
            db,
            splitter: CommitSplitter::new(chunking),
        }
    }

    /// Number of physical payload rows stored for a branch.
    pub fn payload_count(&self, branch: &BranchId) -> Result<i64, StorageError> {
        self.db
            .with_writer(|conn| commit_log::count_branch(conn, LogTable::Commits, branch.as_str()))
    }

    fn append(&self, table: LogTable, branch: &BranchId, commit: &Commit) -> Result<(), StorageError> {
        let payloads = self.splitter.split(commit)?;
        let encoded = payloads
            .iter()
            .map(|p| p.to_json().map(|json| (p.part, json)))
            .collect::<Result<Vec<_>, _>>()?;

        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                for (part, json) in &encoded {
                    commit_log::insert_payload(
                        tx,
                        table,
                        branch.as_str(),
                        commit.id().as_str(),
                        *part,
                        json,
                    )?;
                }
                Ok(())
            })
        })
    }

    fn load(&self, table: LogTable, branch: &BranchId) -> Result<Vec<Commit>, StorageError> {
        let rows = self
            .db
            .with_writer(|conn| commit_log::query_branch(conn, table, branch.as_str()))?;
        let payloads = rows
            .iter()
            .map(|row| CommitPayload::from_json(&row.payload))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CommitAssembler::assemble(payloads))
    }
}

impl DurableLog for SqliteCommitLog {
    fn append_commit(&self, branch: &BranchId, commit: &Commit) -> Result<(), StorageError> {
        self.append(LogTable::Commits, branch, commit)
    }

    fn append_delivery_record(&self, branch: &BranchId, commit: &Commit) -> Result<(), StorageError> {
        self.append(LogTable::Deliveries, branch, commit)
    }

    fn load_all_commits(&self, branch: &BranchId) -> Result<Vec<Commit>, StorageError> {
        self.load(LogTable::Commits, branch)
    }

    fn load_incoming_commits_from(
        &self,
        branch: &BranchId,
        after: Option<&CommitId>,
    ) -> Result<Vec<Commit>, StorageError> {
        let all = self.load(LogTable::Deliveries, branch)?;
        Ok(crate::suffix_after(all, after))
    }
}
