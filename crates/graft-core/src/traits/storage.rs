//! Durable append-only log and small key-value cache.

use crate::commit::Commit;
use crate::errors::StorageError;
use crate::ids::{BranchId, CommitId};

/// Append-only commit storage, partitioned by branch.
///
/// Two streams per branch: the commit log (everything the branch produced)
/// and the delivery log (incoming commits received but possibly not yet
/// merged).
pub trait DurableLog: Send + Sync {
    fn append_commit(&self, branch: &BranchId, commit: &Commit) -> Result<(), StorageError>;

    fn append_delivery_record(&self, branch: &BranchId, commit: &Commit) -> Result<(), StorageError>;

    /// Every commit the branch produced, oldest first.
    fn load_all_commits(&self, branch: &BranchId) -> Result<Vec<Commit>, StorageError>;

    /// Delivery records strictly after `after`, oldest first. `None`, or an
    /// id never recorded, yields the whole delivery log.
    fn load_incoming_commits_from(
        &self,
        branch: &BranchId,
        after: Option<&CommitId>,
    ) -> Result<Vec<Commit>, StorageError>;
}

/// String key-value cache holding recovery markers.
///
/// Keys from different branches never collide (see `BranchId::key`), so
/// implementations only need per-key atomicity.
pub trait DurableCache: Send + Sync {
    fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
