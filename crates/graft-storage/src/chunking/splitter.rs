//! CommitSplitter: slices a commit into payloads that respect both the
//! statement batch size and the byte cap.

use graft_core::config::ChunkingConfig;
use graft_core::errors::StorageError;
use graft_core::{Commit, Statement};
use tracing::{debug, warn};

use super::CommitPayload;

#[derive(Debug, Clone)]
pub struct CommitSplitter {
    batch_size: usize,
    max_payload_bytes: usize,
}

impl CommitSplitter {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            batch_size: config.effective_batch_size().max(1),
            max_payload_bytes: config.effective_max_payload_bytes(),
        }
    }

    /// Split a commit into ordered payloads, numbered from part 0.
    ///
    /// Commits at or under the batch size start as one payload; larger ones
    /// as addition batches followed by removal batches. Any payload over the
    /// byte cap is halved until it fits. A statement too big to fit on its own
    /// is dropped with a warning. The result is never empty, so the commit's
    /// identity always reaches the log.
    pub fn split(&self, commit: &Commit) -> Result<Vec<CommitPayload>, StorageError> {
        let added: Vec<Statement> = commit.added().iter().cloned().collect();
        let removed: Vec<Statement> = commit.removed().iter().cloned().collect();

        let mut out = Vec::new();
        if commit.statement_count() <= self.batch_size {
            self.fit(commit, added, removed, &mut out)?;
        } else {
            for batch in added.chunks(self.batch_size) {
                self.fit(commit, batch.to_vec(), Vec::new(), &mut out)?;
            }
            for batch in removed.chunks(self.batch_size) {
                self.fit(commit, Vec::new(), batch.to_vec(), &mut out)?;
            }
        }

        if out.is_empty() {
            out.push(CommitPayload::for_commit(commit, Vec::new(), Vec::new()));
        }
        for (part, payload) in out.iter_mut().enumerate() {
            payload.part = part as u32;
        }

        if out.len() > 1 {
            debug!(commit_id = %commit.id(), parts = out.len(), "split commit");
        }
        Ok(out)
    }

    fn fit(
        &self,
        commit: &Commit,
        added: Vec<Statement>,
        removed: Vec<Statement>,
        out: &mut Vec<CommitPayload>,
    ) -> Result<(), StorageError> {
        let payload = CommitPayload::for_commit(commit, added, removed);
        if payload.encoded_len()? <= self.max_payload_bytes {
            out.push(payload);
            return Ok(());
        }

        let CommitPayload { added, removed, .. } = payload;
        match (added.is_empty(), removed.is_empty()) {
            (false, false) => {
                self.fit(commit, added, Vec::new(), out)?;
                self.fit(commit, Vec::new(), removed, out)
            }
            (false, true) => self.halve(commit, added, true, out),
            (true, false) => self.halve(commit, removed, false, out),
            // An empty payload over the cap: the metadata alone is too big.
            (true, true) => {
                warn!(commit_id = %commit.id(), "commit metadata exceeds payload cap");
                out.push(CommitPayload::for_commit(commit, Vec::new(), Vec::new()));
                Ok(())
            }
        }
    }

    fn halve(
        &self,
        commit: &Commit,
        mut statements: Vec<Statement>,
        additions: bool,
        out: &mut Vec<CommitPayload>,
    ) -> Result<(), StorageError> {
        if statements.len() == 1 {
            warn!(
                commit_id = %commit.id(),
                statement = %statements[0],
                max_payload_bytes = self.max_payload_bytes,
                "statement exceeds payload cap on its own, dropping it"
            );
            return Ok(());
        }

        let second = statements.split_off(statements.len() / 2);
        for half in [statements, second] {
            if additions {
                self.fit(commit, half, Vec::new(), out)?;
            } else {
                self.fit(commit, Vec::new(), half, out)?;
            }
        }
        Ok(())
    }
}
