//! The physical wire/log payload.

use chrono::{DateTime, Utc};
use graft_core::errors::StorageError;
use graft_core::{BranchId, Commit, CommitId, Statement};
use serde::{Deserialize, Serialize};

/// One physical payload. A commit is stored as one or more consecutive
/// payloads sharing the same identity; `part` counts from 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitPayload {
    pub commit_id: CommitId,
    pub preceding_commit_id: Option<CommitId>,
    pub originating_branch: BranchId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub part: u32,
    pub added: Vec<Statement>,
    pub removed: Vec<Statement>,
}

impl CommitPayload {
    /// A payload carrying `commit`'s identity with the given statements.
    pub fn for_commit(commit: &Commit, added: Vec<Statement>, removed: Vec<Statement>) -> Self {
        Self {
            commit_id: commit.id().clone(),
            preceding_commit_id: commit.preceding().cloned(),
            originating_branch: commit.originating_branch().clone(),
            message: commit.message().to_string(),
            timestamp: commit.timestamp(),
            part: 0,
            added,
            removed,
        }
    }

    pub fn statement_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(StorageError::serialization)
    }

    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        serde_json::from_str(json).map_err(StorageError::serialization)
    }

    /// Serialized size in bytes.
    pub fn encoded_len(&self) -> Result<usize, StorageError> {
        serde_json::to_vec(self)
            .map(|bytes| bytes.len())
            .map_err(StorageError::serialization)
    }

    /// Start a commit from this payload's identity and statements.
    pub fn into_commit(self) -> Commit {
        Commit::from_parts(
            self.commit_id,
            self.originating_branch,
            self.preceding_commit_id,
            self.timestamp,
            self.message,
            self.added,
            self.removed,
        )
    }
}
