//! Commit: an identified, ordered bundle of added/removed statements
//! with lineage metadata.
//!
//! A commit grows only while the engine runs the service fixpoint loop on it
//! (append-only); once persisted it is treated as immutable. Cloning is
//! shallow: the two sequences are independent, the statements are shared.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::ids::{BranchId, CommitId};
use crate::statement::Statement;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    id: CommitId,
    originating_branch: BranchId,
    preceding: Option<CommitId>,
    timestamp: DateTime<Utc>,
    message: String,
    added: IndexSet<Statement>,
    removed: IndexSet<Statement>,
}

impl Commit {
    /// Create a new commit with a fresh id, chained after `preceding`.
    pub fn new(
        branch: BranchId,
        preceding: Option<CommitId>,
        message: impl Into<String>,
        added: impl IntoIterator<Item = Statement>,
        removed: impl IntoIterator<Item = Statement>,
    ) -> Self {
        Self {
            id: CommitId::generate(),
            originating_branch: branch,
            preceding,
            timestamp: Utc::now(),
            message: message.into(),
            added: added.into_iter().collect(),
            removed: removed.into_iter().collect(),
        }
    }

    /// Create the local commit recording the merge of `merged`.
    ///
    /// Keeps the merged commit's id and message so identity is stable across
    /// branches, but takes a branch-local position: the originating branch
    /// becomes `branch` and the parent becomes `preceding`. The change set is
    /// whatever the local graph actually absorbed.
    pub fn merge_of(
        merged: &Commit,
        branch: BranchId,
        preceding: Option<CommitId>,
        added: impl IntoIterator<Item = Statement>,
        removed: impl IntoIterator<Item = Statement>,
    ) -> Self {
        Self {
            id: merged.id.clone(),
            originating_branch: branch,
            preceding,
            timestamp: Utc::now(),
            message: merged.message.clone(),
            added: added.into_iter().collect(),
            removed: removed.into_iter().collect(),
        }
    }

    /// Rebuild a commit from already-persisted parts.
    pub fn from_parts(
        id: CommitId,
        originating_branch: BranchId,
        preceding: Option<CommitId>,
        timestamp: DateTime<Utc>,
        message: String,
        added: impl IntoIterator<Item = Statement>,
        removed: impl IntoIterator<Item = Statement>,
    ) -> Self {
        Self {
            id,
            originating_branch,
            preceding,
            timestamp,
            message,
            added: added.into_iter().collect(),
            removed: removed.into_iter().collect(),
        }
    }

    pub fn id(&self) -> &CommitId {
        &self.id
    }

    pub fn originating_branch(&self) -> &BranchId {
        &self.originating_branch
    }

    pub fn preceding(&self) -> Option<&CommitId> {
        self.preceding.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn added(&self) -> &IndexSet<Statement> {
        &self.added
    }

    pub fn removed(&self) -> &IndexSet<Statement> {
        &self.removed
    }

    /// Additions at or after `offset`, oldest first.
    pub fn added_since(&self, offset: usize) -> impl Iterator<Item = &Statement> {
        self.added.iter().skip(offset)
    }

    /// Removals at or after `offset`, oldest first.
    pub fn removed_since(&self, offset: usize) -> impl Iterator<Item = &Statement> {
        self.removed.iter().skip(offset)
    }

    /// Append additions. Statements already present keep their position.
    pub fn append_added(&mut self, statements: impl IntoIterator<Item = Statement>) {
        self.added.extend(statements);
    }

    /// Append removals. Statements already present keep their position.
    pub fn append_removed(&mut self, statements: impl IntoIterator<Item = Statement>) {
        self.removed.extend(statements);
    }

    pub fn addition_count(&self) -> usize {
        self.added.len()
    }

    pub fn removal_count(&self) -> usize {
        self.removed.len()
    }

    pub fn statement_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Per-destination copy: same identity and metadata, independent change
    /// sequences over shared statements.
    pub fn shallow_clone(&self) -> Self {
        self.clone()
    }

    /// Serialize the whole commit for a recovery marker.
    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(StorageError::serialization)
    }

    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        serde_json::from_str(json).map_err(StorageError::serialization)
    }

    /// Cancel statements that were both added and removed after the given
    /// offsets.
    ///
    /// Scans additions from the newest back to `base_add_offset`, then
    /// removals from the newest back to `base_remove_offset`; every scanned
    /// statement that also occurs in the other sequence is dropped from both.
    /// The prefix below the offsets is taken as already clean. Idempotent.
    pub fn remove_effectless_statements(&mut self, base_add_offset: usize, base_remove_offset: usize) {
        let mut cancelled: HashSet<Statement> = HashSet::new();

        for stmt in self.added.iter().skip(base_add_offset).rev() {
            if self.removed.contains(stmt) {
                cancelled.insert(stmt.clone());
            }
        }
        for stmt in self.removed.iter().skip(base_remove_offset).rev() {
            if self.added.contains(stmt) {
                cancelled.insert(stmt.clone());
            }
        }

        if cancelled.is_empty() {
            return;
        }
        self.added.retain(|s| !cancelled.contains(s));
        self.removed.retain(|s| !cancelled.contains(s));
    }
}
