//! Branch: the per-branch coordinator.
//!
//! Owns the graph behind a single-writer lock together with the aggregator
//! subscribed to it and the local services. Local commits run on the
//! caller's thread; incoming commits are merged by a dedicated worker; both
//! go through the same augment, persist, forward pipeline.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender};
use graft_core::errors::{ConfigError, GraftResult, GraphError, HandlerError};
use graft_core::traits::{
    AugmentationService, CommitDestination, DurableCache, DurableLog, GraphStore, HandlerOutcome,
    IncomingHandler,
};
use graft_core::{BranchId, Commit, CommitId, GraftConfig};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::aggregator::DiffAggregator;
use crate::fixpoint::run_service_loop;
use crate::state_keeper::StateKeeper;
use crate::streamer::{CommitStreamer, StreamerStats};
use crate::work::{guarded, is_current, spawn_worker, WorkItem};

/// Configures and starts a [`Branch`].
///
/// Services, handlers and destinations are registered here because startup
/// recovery already exercises them.
pub struct BranchBuilder {
    id: BranchId,
    graph: Box<dyn GraphStore>,
    log: Arc<dyn DurableLog>,
    cache: Arc<dyn DurableCache>,
    config: GraftConfig,
    services: Vec<Arc<dyn AugmentationService>>,
    handlers: Vec<Arc<dyn IncomingHandler>>,
    destinations: Vec<Arc<dyn CommitDestination>>,
}

impl BranchBuilder {
    pub fn new(
        id: impl Into<BranchId>,
        graph: impl GraphStore + 'static,
        log: Arc<dyn DurableLog>,
        cache: Arc<dyn DurableCache>,
    ) -> Self {
        Self {
            id: id.into(),
            graph: Box::new(graph),
            log,
            cache,
            config: GraftConfig::default(),
            services: Vec::new(),
            handlers: Vec::new(),
            destinations: Vec::new(),
        }
    }

    pub fn config(mut self, config: GraftConfig) -> Self {
        self.config = config;
        self
    }

    pub fn service(mut self, service: Arc<dyn AugmentationService>) -> Self {
        self.services.push(service);
        self
    }

    pub fn incoming_handler(mut self, handler: Arc<dyn IncomingHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn destination(mut self, destination: Arc<dyn CommitDestination>) -> Self {
        self.destinations.push(destination);
        self
    }

    /// Recover durable state and start both workers.
    ///
    /// Unforwarded commits are requeued before an unfinished preliminary
    /// commit is resumed, so the resumed commit is forwarded once, after its
    /// predecessors.
    pub fn start(self) -> GraftResult<Branch> {
        let BranchBuilder {
            id,
            mut graph,
            log,
            cache,
            config,
            services,
            handlers,
            destinations,
        } = self;

        let aggregator = Arc::new(DiffAggregator::new());
        graph.subscribe(aggregator.clone());

        let keeper = Arc::new(StateKeeper::new(id.clone(), log, cache));
        let preliminary = keeper.load_state()?;

        let streamer = CommitStreamer::new(
            Arc::clone(&keeper),
            destinations,
            config.engine.effective_outgoing_queue_capacity(),
        );
        streamer.start()?;
        streamer.recover_state()?;

        let core = Arc::new(BranchCore {
            id: id.clone(),
            state: Mutex::new(CoreState { graph, services }),
            aggregator,
            keeper,
            streamer,
            handlers: RwLock::new(handlers),
            queued: Mutex::new(HashSet::new()),
            max_rounds: config.engine.effective_max_fixpoint_rounds(),
            active: AtomicBool::new(true),
            narrowed_merges: AtomicU64::new(0),
        });

        if let Some(commit) = preliminary {
            info!(branch = %id, commit_id = %commit.id(), "resuming unfinished commit");
            let mut state = core.state.lock();
            let CoreState { graph, services } = &mut *state;
            core.handle_commit_internally(graph.as_mut(), services, commit)?;
        }

        let (incoming_tx, incoming_rx) = bounded(config.engine.effective_incoming_queue_capacity());
        let inner = BranchInner {
            core,
            incoming_tx,
            incoming_rx,
            incoming_worker: Mutex::new(None),
        };

        if inner.core.handlers.read().is_empty() {
            debug!(branch = %id, "no incoming handlers, incoming worker not started");
        } else {
            inner.start_incoming_worker()?;
            inner.admit_non_merged()?;
        }

        info!(branch = %id, commits = inner.core.keeper.commit_count(), "branch started");
        Ok(Branch {
            inner: Arc::new(inner),
        })
    }
}

/// Handle to a running branch. Clones share the same branch.
#[derive(Clone)]
pub struct Branch {
    inner: Arc<BranchInner>,
}

impl Branch {
    pub fn id(&self) -> &BranchId {
        &self.inner.core.id
    }

    /// Run `f` with exclusive access to the graph.
    ///
    /// Edits made here stay pending until the next `commit_changes`. An
    /// incoming merge that runs in between folds them into its merge commit;
    /// use [`Branch::commit_with`] to edit and commit in one step.
    pub fn with_graph<R>(&self, f: impl FnOnce(&mut dyn GraphStore) -> R) -> R {
        let mut state = self.inner.core.state.lock();
        f(state.graph.as_mut())
    }

    /// Turn the pending edits into a commit. `Ok(None)` when there are none.
    pub fn commit_changes(&self, message: &str) -> GraftResult<Option<Commit>> {
        let core = &self.inner.core;
        let mut state = core.state.lock();
        core.commit_pending(&mut state, message)
    }

    /// Apply `edit` and commit the result without letting a merge interleave.
    pub fn commit_with<E>(&self, message: &str, edit: E) -> GraftResult<Option<Commit>>
    where
        E: FnOnce(&mut dyn GraphStore) -> Result<(), GraphError>,
    {
        let core = &self.inner.core;
        let mut state = core.state.lock();
        core.ensure_active()?;
        edit(state.graph.as_mut())?;
        core.commit_pending(&mut state, message)
    }

    /// Admit a commit from another branch for merging.
    ///
    /// Commits already merged or already queued are ignored. Admitted commits
    /// are recorded durably first so they survive a crash before merging.
    pub fn enqueue_incoming_commit(&self, commit: Commit) -> GraftResult<()> {
        let core = &self.inner.core;
        core.ensure_active()?;
        if core.handlers.read().is_empty() {
            return Err(ConfigError::NoIncomingHandlers {
                branch: core.id.to_string(),
            }
            .into());
        }
        if !self.inner.claim(&commit) {
            return Ok(());
        }
        if let Err(e) = core.keeper.before_merge(&commit) {
            core.queued.lock().remove(commit.id());
            return Err(e.into());
        }
        self.inner.send(commit);
        Ok(())
    }

    pub fn has_seen_commit(&self, id: &CommitId) -> bool {
        self.inner.core.keeper.has_seen_commit(id)
    }

    pub fn last_commit_id(&self) -> Option<CommitId> {
        self.inner.core.keeper.last_commit_id()
    }

    /// The branch's commit chain, oldest first.
    pub fn commits(&self) -> Vec<Commit> {
        self.inner.core.keeper.commits()
    }

    /// Number of merges where a handler reported applying a narrowed commit.
    pub fn narrowed_merge_count(&self) -> u64 {
        self.inner.core.narrowed_merges.load(Ordering::Relaxed)
    }

    /// Register an incoming handler. Adding the first handler (re)starts the
    /// incoming worker and re-admits commits still waiting to be merged.
    pub fn add_incoming_handler(&self, handler: Arc<dyn IncomingHandler>) -> GraftResult<()> {
        let core = &self.inner.core;
        let rearm = {
            let mut handlers = core.handlers.write();
            handlers.push(handler);
            handlers.len() == 1
        };
        if rearm && core.active.load(Ordering::SeqCst) {
            info!(branch = %core.id, "re-arming incoming worker");
            self.inner.start_incoming_worker()?;
            self.inner.admit_non_merged()?;
        }
        Ok(())
    }

    /// Remove handlers by name. Removing the last one stops the incoming
    /// worker after it drains. Returns whether any handler was removed.
    pub fn remove_incoming_handler(&self, name: &str) -> bool {
        let core = &self.inner.core;
        let (removed, now_empty) = {
            let mut handlers = core.handlers.write();
            let before = handlers.len();
            handlers.retain(|h| h.name() != name);
            (handlers.len() != before, handlers.is_empty())
        };
        if removed && now_empty {
            info!(branch = %core.id, "last incoming handler removed, stopping incoming worker");
            self.inner.stop_incoming_worker();
        }
        removed
    }

    pub fn add_destination(&self, destination: Arc<dyn CommitDestination>) {
        self.inner.core.streamer.add_destination(destination);
    }

    pub fn remove_destination(&self, name: &str) -> bool {
        self.inner.core.streamer.remove_destination(name)
    }

    pub fn is_active(&self) -> bool {
        self.inner.core.active.load(Ordering::SeqCst)
    }

    /// Stop accepting work, drain both queues, and stop the workers.
    /// Returns the streamer's totals; a second call returns zeros.
    pub fn deactivate(&self) -> StreamerStats {
        self.inner.shutdown()
    }
}

/// Adapts a receiving [`Branch`] as another branch's destination.
///
/// Delivery blocks while the target's incoming queue is full. Two branches
/// wired to each other can deadlock once both queues fill, because each
/// merge worker blocks on its own outgoing queue while holding the writer
/// lock. Size both queue capacities above the largest expected burst.
pub struct BranchDestination {
    target: Branch,
}

impl BranchDestination {
    pub fn new(target: Branch) -> Self {
        Self { target }
    }
}

impl CommitDestination for BranchDestination {
    fn name(&self) -> &str {
        self.target.id().as_str()
    }

    fn deliver(&self, commit: Commit) -> Result<(), HandlerError> {
        let commit_id = commit.id().to_string();
        self.target
            .enqueue_incoming_commit(commit)
            .map_err(|e| HandlerError::DeliveryFailed {
                destination: self.name().to_string(),
                commit_id,
                message: e.to_string(),
            })
    }
}

/// Graph and services: everything the single writer owns.
struct CoreState {
    graph: Box<dyn GraphStore>,
    services: Vec<Arc<dyn AugmentationService>>,
}

/// State shared between the handle and the incoming worker.
struct BranchCore {
    id: BranchId,
    state: Mutex<CoreState>,
    aggregator: Arc<DiffAggregator>,
    keeper: Arc<StateKeeper>,
    streamer: CommitStreamer,
    handlers: RwLock<Vec<Arc<dyn IncomingHandler>>>,
    /// Ids admitted to the incoming queue and not yet processed.
    queued: Mutex<HashSet<CommitId>>,
    max_rounds: usize,
    active: AtomicBool,
    narrowed_merges: AtomicU64,
}

impl BranchCore {
    fn ensure_active(&self) -> GraftResult<()> {
        if self.active.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ConfigError::Deactivated {
                branch: self.id.to_string(),
            }
            .into())
        }
    }

    fn commit_pending(&self, state: &mut CoreState, message: &str) -> GraftResult<Option<Commit>> {
        if let Err(e) = self.ensure_active() {
            self.aggregator.discard();
            return Err(e);
        }
        if !self.aggregator.has_pending() {
            debug!(branch = %self.id, "nothing to commit");
            return Ok(None);
        }

        let commit = Commit::new(
            self.id.clone(),
            self.keeper.last_commit_id(),
            message,
            self.aggregator.retrieve_added(),
            self.aggregator.retrieve_removed(),
        );
        let CoreState { graph, services } = state;
        self.handle_commit_internally(graph.as_mut(), services, commit)
            .map(Some)
    }

    /// Record `merged` under this branch's chain once the handlers applied it.
    fn commit_merge_of(
        &self,
        graph: &mut dyn GraphStore,
        services: &[Arc<dyn AugmentationService>],
        merged: &Commit,
    ) -> GraftResult<Commit> {
        let commit = Commit::merge_of(
            merged,
            self.id.clone(),
            self.keeper.last_commit_id(),
            self.aggregator.retrieve_added(),
            self.aggregator.retrieve_removed(),
        );
        self.handle_commit_internally(graph, services, commit)
    }

    /// Augment, persist, forward.
    ///
    /// A failure to append to the commit log aborts the transaction and is
    /// returned: the commit is lost and the caller must know. The graph
    /// transaction commits after the append; if that fails the logged commit
    /// is not forwarded now but on the next restart.
    fn handle_commit_internally(
        &self,
        graph: &mut dyn GraphStore,
        services: &[Arc<dyn AugmentationService>],
        mut commit: Commit,
    ) -> GraftResult<Commit> {
        let augment = !services.is_empty() && !commit.is_empty();
        if augment {
            self.checkpoint(graph, &commit);
        }

        {
            let mut txn = TxnScope::begin(graph);
            if augment {
                let outcome = run_service_loop(
                    &mut commit,
                    services,
                    txn.graph(),
                    &self.aggregator,
                    self.max_rounds,
                );
                debug!(
                    branch = %self.id,
                    commit_id = %commit.id(),
                    rounds = outcome.rounds,
                    converged = outcome.converged,
                    "services applied"
                );
            }

            if let Err(e) = self.keeper.after_services(&commit) {
                error!(
                    branch = %self.id,
                    commit_id = %commit.id(),
                    error = %e,
                    "failed to persist commit, aborting"
                );
                txn.abort();
                self.aggregator.discard();
                return Err(e.into());
            }
            if let Err(e) = txn.commit() {
                error!(branch = %self.id, commit_id = %commit.id(), error = %e, "graph commit failed");
                return Err(e.into());
            }
        }

        info!(
            branch = %self.id,
            commit_id = %commit.id(),
            added = commit.addition_count(),
            removed = commit.removal_count(),
            "commit recorded"
        );
        self.streamer.enqueue(commit.clone());
        Ok(commit)
    }

    /// Best-effort checkpoint of the unaugmented commit.
    fn checkpoint(&self, graph: &mut dyn GraphStore, commit: &Commit) {
        let mut txn = TxnScope::begin(graph);
        match self.keeper.before_services(commit) {
            Ok(()) => {
                if let Err(e) = txn.commit() {
                    warn!(branch = %self.id, commit_id = %commit.id(), error = %e, "checkpoint commit failed");
                }
            }
            Err(e) => {
                warn!(
                    branch = %self.id,
                    commit_id = %commit.id(),
                    error = %e,
                    "checkpoint failed, continuing without it"
                );
            }
        }
    }

    /// Apply an incoming commit with every handler, then record the merge.
    fn merge_incoming(&self, commit: &Commit) -> GraftResult<()> {
        let handlers = self.handlers.read().clone();
        if handlers.is_empty() {
            warn!(branch = %self.id, commit_id = %commit.id(), "no incoming handlers, leaving commit unmerged");
            return Ok(());
        }

        let mut state = self.state.lock();
        let CoreState { graph, services } = &mut *state;
        let mut txn = TxnScope::begin(graph.as_mut());

        for handler in &handlers {
            match guarded(handler.name(), || handler.handle_commit(commit, txn.graph())) {
                Ok(HandlerOutcome::Applied) => {}
                Ok(HandlerOutcome::Narrowed(applied)) => {
                    self.narrowed_merges.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        branch = %self.id,
                        commit_id = %commit.id(),
                        handler = handler.name(),
                        applied = applied.statement_count(),
                        delivered = commit.statement_count(),
                        "handler applied a narrowed commit"
                    );
                }
                Err(e) => {
                    warn!(
                        branch = %self.id,
                        commit_id = %commit.id(),
                        handler = handler.name(),
                        error = %e,
                        "incoming handler failed"
                    );
                }
            }
        }

        self.commit_merge_of(txn.graph(), services, commit)?;
        txn.commit()?;
        drop(txn);
        drop(state);

        if let Err(e) = self.keeper.finished_merge(commit) {
            warn!(branch = %self.id, commit_id = %commit.id(), error = %e, "failed to record finished merge");
        }
        Ok(())
    }
}

/// Graph transaction that always ends, whatever path leaves the scope.
struct TxnScope<'g> {
    graph: &'g mut dyn GraphStore,
}

impl<'g> TxnScope<'g> {
    fn begin(graph: &'g mut dyn GraphStore) -> Self {
        graph.begin();
        Self { graph }
    }

    fn graph(&mut self) -> &mut dyn GraphStore {
        &mut *self.graph
    }

    fn commit(&mut self) -> Result<(), GraphError> {
        self.graph.commit()
    }

    fn abort(&mut self) {
        self.graph.abort();
    }
}

impl Drop for TxnScope<'_> {
    fn drop(&mut self) {
        self.graph.end();
    }
}

/// Owned by the handles only, so dropping the last handle stops the workers.
struct BranchInner {
    core: Arc<BranchCore>,
    incoming_tx: Sender<WorkItem>,
    incoming_rx: Receiver<WorkItem>,
    incoming_worker: Mutex<Option<JoinHandle<()>>>,
}

impl BranchInner {
    /// Reserve a commit for the incoming queue. False if it was merged
    /// already or is queued.
    fn claim(&self, commit: &Commit) -> bool {
        let core = &self.core;
        if core.keeper.has_seen_commit(commit.id()) || !core.queued.lock().insert(commit.id().clone()) {
            info!(branch = %core.id, commit_id = %commit.id(), "ignoring already seen commit");
            return false;
        }
        true
    }

    fn send(&self, commit: Commit) {
        debug!(branch = %self.core.id, commit_id = %commit.id(), "queueing incoming commit");
        if self.incoming_tx.send(WorkItem::Commit(commit)).is_err() {
            error!(branch = %self.core.id, "incoming queue disconnected");
        }
    }

    /// Queue delivered commits that never finished merging.
    fn admit_non_merged(&self) -> GraftResult<()> {
        let pending = self.core.keeper.get_non_merged_commits()?;
        let mut admitted = 0usize;
        for commit in pending {
            if self.claim(&commit) {
                self.send(commit);
                admitted += 1;
            }
        }
        if admitted > 0 {
            info!(branch = %self.core.id, admitted, "re-admitted unmerged incoming commits");
        }
        Ok(())
    }

    fn start_incoming_worker(&self) -> GraftResult<()> {
        let mut worker = self.incoming_worker.lock();
        if worker.is_some() {
            return Ok(());
        }
        let core = Arc::clone(&self.core);
        let receiver = self.incoming_rx.clone();
        *worker = Some(spawn_worker(format!("graft-in-{}", self.core.id), move || {
            merge_loop(core, receiver)
        })?);
        Ok(())
    }

    fn stop_incoming_worker(&self) {
        let Some(handle) = self.incoming_worker.lock().take() else {
            return;
        };
        if self.incoming_tx.send(WorkItem::Shutdown).is_err() {
            error!(branch = %self.core.id, "incoming queue disconnected");
        }
        if is_current(&handle) {
            return;
        }
        if handle.join().is_err() {
            error!(branch = %self.core.id, "incoming worker panicked");
        }
    }

    fn shutdown(&self) -> StreamerStats {
        {
            // Taking the writer lock lets an in-flight commit finish and
            // reach the outgoing queue first.
            let _state = self.core.state.lock();
            if !self.core.active.swap(false, Ordering::SeqCst) {
                return StreamerStats::default();
            }
        }
        self.stop_incoming_worker();
        let stats = self.core.streamer.shutdown();
        info!(branch = %self.core.id, forwarded = stats.commits_forwarded, "branch deactivated");
        stats
    }
}

impl Drop for BranchInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn merge_loop(core: Arc<BranchCore>, receiver: Receiver<WorkItem>) {
    info!(branch = %core.id, "incoming worker started");
    for item in receiver.iter() {
        let commit = match item {
            WorkItem::Commit(commit) => commit,
            WorkItem::Shutdown => break,
        };
        if let Err(e) = core.merge_incoming(&commit) {
            error!(branch = %core.id, commit_id = %commit.id(), error = %e, "merge failed");
        }
        core.queued.lock().remove(commit.id());
    }
    info!(branch = %core.id, "incoming worker stopped");
}
