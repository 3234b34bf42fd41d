//! StateKeeper: durable bookkeeping of a branch's produced, merged, and
//! forwarded commits, plus the in-flight preliminary commit used for crash
//! recovery.
//!
//! The commit log is the source of truth; cache markers only shorten
//! recovery. Marker writes after a successful append may therefore fail
//! without harm.

use std::collections::HashSet;
use std::sync::Arc;

use graft_core::constants::{
    KEY_LAST_FORWARDED, KEY_LAST_PROCESSED_INCOMING, KEY_LAST_PRODUCED,
    KEY_PRELIMINARY_COMMIT_CONTENT, KEY_PRELIMINARY_COMMIT_ID,
};
use graft_core::errors::StorageError;
use graft_core::traits::{DurableCache, DurableLog};
use graft_core::{BranchId, Commit, CommitId};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Default)]
struct KeeperState {
    /// Every commit the branch produced, in chain order.
    commits: IndexMap<CommitId, Commit>,
    seen: HashSet<CommitId>,
    last: Option<CommitId>,
}

pub struct StateKeeper {
    branch: BranchId,
    log: Arc<dyn DurableLog>,
    cache: Arc<dyn DurableCache>,
    state: RwLock<KeeperState>,
}

impl StateKeeper {
    pub fn new(branch: BranchId, log: Arc<dyn DurableLog>, cache: Arc<dyn DurableCache>) -> Self {
        Self {
            branch,
            log,
            cache,
            state: RwLock::new(KeeperState::default()),
        }
    }

    pub fn branch(&self) -> &BranchId {
        &self.branch
    }

    /// Replay the commit log into memory and inspect the preliminary marker.
    ///
    /// Returns the checkpointed pre-service commit if the process stopped
    /// before that commit reached the log. If it did reach the log, the stale
    /// markers are cleared instead.
    #[instrument(skip(self), fields(branch = %self.branch))]
    pub fn load_state(&self) -> Result<Option<Commit>, StorageError> {
        let commits = self.log.load_all_commits(&self.branch)?;
        {
            let mut state = self.state.write();
            *state = KeeperState::default();
            for commit in commits {
                state.seen.insert(commit.id().clone());
                state.last = Some(commit.id().clone());
                state.commits.insert(commit.id().clone(), commit);
            }
            info!(commits = state.commits.len(), "replayed commit log");
        }

        let Some(preliminary_id) = self.cache.get(&self.key(KEY_PRELIMINARY_COMMIT_ID))? else {
            return Ok(None);
        };

        if self.has_seen_commit(&CommitId::from(preliminary_id.as_str())) {
            debug!(commit_id = %preliminary_id, "preliminary commit already logged, clearing markers");
            self.clear_preliminary();
            return Ok(None);
        }

        match self.cache.get(&self.key(KEY_PRELIMINARY_COMMIT_CONTENT))? {
            Some(json) => match Commit::from_json(&json) {
                Ok(commit) => {
                    info!(commit_id = %commit.id(), "found unfinished preliminary commit");
                    Ok(Some(commit))
                }
                Err(e) => {
                    warn!(commit_id = %preliminary_id, error = %e, "unreadable preliminary commit, discarding");
                    self.clear_preliminary();
                    Ok(None)
                }
            },
            None => {
                warn!(commit_id = %preliminary_id, "preliminary marker without content, discarding");
                self.clear_preliminary();
                Ok(None)
            }
        }
    }

    /// Checkpoint the unaugmented commit. Content goes first so an id marker
    /// always has content behind it.
    #[instrument(skip_all, fields(branch = %self.branch, commit_id = %commit.id()))]
    pub fn before_services(&self, commit: &Commit) -> Result<(), StorageError> {
        self.cache
            .put(&self.key(KEY_PRELIMINARY_COMMIT_CONTENT), &commit.to_json()?)?;
        self.cache
            .put(&self.key(KEY_PRELIMINARY_COMMIT_ID), commit.id().as_str())
    }

    /// Append the finished commit to the log and make it the branch head.
    /// Only the append can fail this call.
    #[instrument(skip_all, fields(branch = %self.branch, commit_id = %commit.id()))]
    pub fn after_services(&self, commit: &Commit) -> Result<(), StorageError> {
        self.log.append_commit(&self.branch, commit)?;
        {
            let mut state = self.state.write();
            state.seen.insert(commit.id().clone());
            state.last = Some(commit.id().clone());
            state.commits.insert(commit.id().clone(), commit.clone());
        }

        if let Err(e) = self
            .cache
            .put(&self.key(KEY_LAST_PRODUCED), commit.id().as_str())
        {
            warn!(error = %e, "failed to record last produced commit");
        }
        self.clear_preliminary();
        Ok(())
    }

    /// Record a received commit before it is admitted for merging.
    #[instrument(skip_all, fields(branch = %self.branch, commit_id = %commit.id()))]
    pub fn before_merge(&self, commit: &Commit) -> Result<(), StorageError> {
        self.log.append_delivery_record(&self.branch, commit)
    }

    #[instrument(skip_all, fields(branch = %self.branch, commit_id = %commit.id()))]
    pub fn finished_merge(&self, commit: &Commit) -> Result<(), StorageError> {
        self.cache
            .put(&self.key(KEY_LAST_PROCESSED_INCOMING), commit.id().as_str())
    }

    /// Received commits not merged yet, oldest first.
    pub fn get_non_merged_commits(&self) -> Result<Vec<Commit>, StorageError> {
        let last = self
            .cache
            .get(&self.key(KEY_LAST_PROCESSED_INCOMING))?
            .map(CommitId::from);
        let delivered = self
            .log
            .load_incoming_commits_from(&self.branch, last.as_ref())?;

        // A merge can land in the log without its marker update; those are done.
        let state = self.state.read();
        Ok(delivered
            .into_iter()
            .filter(|c| !state.seen.contains(c.id()))
            .collect())
    }

    #[instrument(skip_all, fields(branch = %self.branch, commit_id = %commit.id()))]
    pub fn after_forwarded(&self, commit: &Commit) -> Result<(), StorageError> {
        self.cache
            .put(&self.key(KEY_LAST_FORWARDED), commit.id().as_str())
    }

    /// Produced commits strictly after the last forwarded one. Everything if
    /// nothing was forwarded yet, or if the marker names an unknown commit.
    pub fn get_non_forwarded_commits(&self) -> Result<Vec<Commit>, StorageError> {
        let last = self
            .cache
            .get(&self.key(KEY_LAST_FORWARDED))?
            .map(CommitId::from);

        let state = self.state.read();
        let start = last
            .and_then(|id| state.commits.get_index_of(&id))
            .map_or(0, |idx| idx + 1);
        Ok(state.commits.values().skip(start).cloned().collect())
    }

    pub fn has_seen_commit(&self, id: &CommitId) -> bool {
        self.state.read().seen.contains(id)
    }

    pub fn last_commit_id(&self) -> Option<CommitId> {
        self.state.read().last.clone()
    }

    pub fn commits(&self) -> Vec<Commit> {
        self.state.read().commits.values().cloned().collect()
    }

    pub fn commit_count(&self) -> usize {
        self.state.read().commits.len()
    }

    fn clear_preliminary(&self) {
        for key in [KEY_PRELIMINARY_COMMIT_ID, KEY_PRELIMINARY_COMMIT_CONTENT] {
            if let Err(e) = self.cache.remove(&self.key(key)) {
                warn!(branch = %self.branch, key, error = %e, "failed to clear preliminary marker");
            }
        }
    }

    fn key(&self, key: &str) -> String {
        self.branch.key(key)
    }
}
