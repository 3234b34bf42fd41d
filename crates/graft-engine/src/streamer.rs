//! CommitStreamer: fans a branch's finished commits out to every registered
//! destination.
//!
//! Single consumer of the outgoing queue. Each destination gets its own
//! shallow copy of the commit and fails alone. The forwarded marker is
//! updated after every commit regardless of delivery results; delivery is
//! at-least-once and receivers dedup by commit id.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender};
use graft_core::errors::{GraftError, StorageError};
use graft_core::traits::CommitDestination;
use graft_core::{BranchId, Commit};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::state_keeper::StateKeeper;
use crate::work::{guarded, is_current, spawn_worker, WorkItem};

/// Counters reported when the streamer shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamerStats {
    pub commits_forwarded: u64,
    pub deliveries_ok: u64,
    pub deliveries_failed: u64,
}

type Destinations = Arc<RwLock<Vec<Arc<dyn CommitDestination>>>>;

pub struct CommitStreamer {
    branch: BranchId,
    keeper: Arc<StateKeeper>,
    destinations: Destinations,
    sender: Sender<WorkItem>,
    receiver: Receiver<WorkItem>,
    handle: Mutex<Option<JoinHandle<StreamerStats>>>,
}

impl CommitStreamer {
    pub fn new(
        keeper: Arc<StateKeeper>,
        destinations: Vec<Arc<dyn CommitDestination>>,
        capacity: usize,
    ) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            branch: keeper.branch().clone(),
            keeper,
            destinations: Arc::new(RwLock::new(destinations)),
            sender,
            receiver,
            handle: Mutex::new(None),
        }
    }

    /// Spawn the forwarding worker. No-op if it is already running.
    pub fn start(&self) -> Result<(), GraftError> {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Ok(());
        }

        let receiver = self.receiver.clone();
        let destinations = Arc::clone(&self.destinations);
        let keeper = Arc::clone(&self.keeper);
        *handle = Some(spawn_worker(format!("graft-out-{}", self.branch), move || {
            forward_loop(receiver, destinations, keeper)
        })?);
        Ok(())
    }

    /// Requeue every commit not yet marked forwarded. Returns how many.
    pub fn recover_state(&self) -> Result<usize, StorageError> {
        let pending = self.keeper.get_non_forwarded_commits()?;
        let count = pending.len();
        for commit in pending {
            self.enqueue(commit);
        }
        if count > 0 {
            info!(branch = %self.branch, count, "requeued unforwarded commits");
        }
        Ok(count)
    }

    /// Queue a commit for forwarding. Blocks while the queue is full.
    pub fn enqueue(&self, commit: Commit) {
        debug!(branch = %self.branch, commit_id = %commit.id(), "queueing commit for forwarding");
        // The streamer holds a receiver itself, so the channel never disconnects.
        if self.sender.send(WorkItem::Commit(commit)).is_err() {
            error!(branch = %self.branch, "outgoing queue disconnected");
        }
    }

    pub fn add_destination(&self, destination: Arc<dyn CommitDestination>) {
        self.destinations.write().push(destination);
    }

    /// Remove every destination with this name. Returns whether any was removed.
    pub fn remove_destination(&self, name: &str) -> bool {
        let mut destinations = self.destinations.write();
        let before = destinations.len();
        destinations.retain(|d| d.name() != name);
        destinations.len() != before
    }

    pub fn destination_count(&self) -> usize {
        self.destinations.read().len()
    }

    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Drain everything queued so far, stop the worker, and report totals.
    pub fn shutdown(&self) -> StreamerStats {
        let Some(handle) = self.handle.lock().take() else {
            return StreamerStats::default();
        };
        if self.sender.send(WorkItem::Shutdown).is_err() {
            error!(branch = %self.branch, "outgoing queue disconnected");
        }
        if is_current(&handle) {
            warn!(branch = %self.branch, "streamer shut down from its own worker, not joining");
            return StreamerStats::default();
        }
        handle.join().unwrap_or_else(|_| {
            error!(branch = %self.branch, "forwarding worker panicked");
            StreamerStats::default()
        })
    }
}

fn forward_loop(
    receiver: Receiver<WorkItem>,
    destinations: Destinations,
    keeper: Arc<StateKeeper>,
) -> StreamerStats {
    let branch = keeper.branch().clone();
    let mut stats = StreamerStats::default();
    info!(%branch, "forwarding worker started");

    for item in receiver.iter() {
        let commit = match item {
            WorkItem::Commit(commit) => commit,
            WorkItem::Shutdown => break,
        };

        let targets: Vec<Arc<dyn CommitDestination>> = destinations.read().clone();
        for destination in &targets {
            match guarded(destination.name(), || destination.deliver(commit.shallow_clone())) {
                Ok(()) => stats.deliveries_ok += 1,
                Err(e) => {
                    stats.deliveries_failed += 1;
                    warn!(
                        %branch,
                        commit_id = %commit.id(),
                        destination = destination.name(),
                        error = %e,
                        "delivery failed"
                    );
                }
            }
        }

        if let Err(e) = keeper.after_forwarded(&commit) {
            warn!(%branch, commit_id = %commit.id(), error = %e, "failed to record forwarded commit");
        }
        stats.commits_forwarded += 1;
    }

    info!(
        %branch,
        forwarded = stats.commits_forwarded,
        failed = stats.deliveries_failed,
        "forwarding worker stopped"
    );
    stats
}
