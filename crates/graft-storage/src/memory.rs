//! In-memory durable log and cache.
//!
//! Shared through `Arc`, they outlive a dropped branch, which is how tests
//! simulate a crash and restart. Both can be told to fail their next
//! operations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use graft_core::errors::StorageError;
use graft_core::traits::{DurableCache, DurableLog};
use graft_core::{BranchId, Commit, CommitId};
use parking_lot::Mutex;

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn injected(resource: &str) -> StorageError {
    StorageError::Unavailable {
        resource: resource.to_string(),
        message: "injected failure".to_string(),
    }
}

#[derive(Debug, Default)]
pub struct MemoryLog {
    commits: Mutex<HashMap<BranchId, Vec<Commit>>>,
    deliveries: Mutex<HashMap<BranchId, Vec<Commit>>>,
    fail_appends: AtomicUsize,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` commit appends fail.
    pub fn fail_next_appends(&self, n: usize) {
        self.fail_appends.store(n, Ordering::SeqCst);
    }

    pub fn commit_count(&self, branch: &BranchId) -> usize {
        self.commits.lock().get(branch).map_or(0, Vec::len)
    }

    pub fn delivery_count(&self, branch: &BranchId) -> usize {
        self.deliveries.lock().get(branch).map_or(0, Vec::len)
    }
}

impl DurableLog for MemoryLog {
    fn append_commit(&self, branch: &BranchId, commit: &Commit) -> Result<(), StorageError> {
        if take_failure(&self.fail_appends) {
            return Err(injected("commit log"));
        }
        self.commits
            .lock()
            .entry(branch.clone())
            .or_default()
            .push(commit.clone());
        Ok(())
    }

    fn append_delivery_record(&self, branch: &BranchId, commit: &Commit) -> Result<(), StorageError> {
        self.deliveries
            .lock()
            .entry(branch.clone())
            .or_default()
            .push(commit.clone());
        Ok(())
    }

    fn load_all_commits(&self, branch: &BranchId) -> Result<Vec<Commit>, StorageError> {
        Ok(self.commits.lock().get(branch).cloned().unwrap_or_default())
    }

    fn load_incoming_commits_from(
        &self,
        branch: &BranchId,
        after: Option<&CommitId>,
    ) -> Result<Vec<Commit>, StorageError> {
        let all = self.deliveries.lock().get(branch).cloned().unwrap_or_default();
        Ok(crate::suffix_after(all, after))
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
    fail_puts: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` puts fail.
    pub fn fail_next_puts(&self, n: usize) {
        self.fail_puts.store(n, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl DurableCache for MemoryCache {
    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if take_failure(&self.fail_puts) {
            return Err(injected("state cache"));
        }
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_failures_are_consumed() {
        let cache = MemoryCache::new();
        cache.fail_next_puts(1);
        assert!(cache.put("k", "v").is_err());
        assert!(cache.put("k", "v").is_ok());
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn incoming_suffix_after_known_id() {
        let log = MemoryLog::new();
        let branch = BranchId::from("b");
        let first = Commit::new(branch.clone(), None, "1", vec![], vec![]);
        let second = Commit::new(branch.clone(), None, "2", vec![], vec![]);
        log.append_delivery_record(&branch, &first).unwrap();
        log.append_delivery_record(&branch, &second).unwrap();

        let after_first = log.load_incoming_commits_from(&branch, Some(first.id())).unwrap();
        assert_eq!(after_first, vec![second.clone()]);
        assert_eq!(log.load_incoming_commits_from(&branch, None).unwrap().len(), 2);
        assert!(log
            .load_incoming_commits_from(&branch, Some(second.id()))
            .unwrap()
            .is_empty());
    }
}
