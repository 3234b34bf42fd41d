//! Test fixtures shared by the engine integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use graft_core::errors::HandlerError;
use graft_core::traits::{
    AugmentationService, CommitDestination, GraphStore, HandlerOutcome, IncomingHandler,
};
use crossbeam_channel::{Receiver, Sender};
use graft_core::{Commit, Statement};
use parking_lot::Mutex;

pub fn st(s: &str, p: &str, o: &str) -> Statement {
    Statement::new(s, p, o)
}

/// Poll `cond` until it holds or five seconds pass.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    cond()
}

/// Applies the delivered commit verbatim.
pub struct ApplyHandler;

impl IncomingHandler for ApplyHandler {
    fn name(&self) -> &str {
        "apply"
    }

    fn handle_commit(
        &self,
        commit: &Commit,
        graph: &mut dyn GraphStore,
    ) -> Result<HandlerOutcome, HandlerError> {
        let added: Vec<Statement> = commit.added().iter().cloned().collect();
        let removed: Vec<Statement> = commit.removed().iter().cloned().collect();
        graph.add(&added)?;
        graph.remove(&removed)?;
        Ok(HandlerOutcome::Applied)
    }
}

/// Applies only additions whose predicate matches, reporting the narrowing.
pub struct PredicateFilterHandler {
    pub predicate: &'static str,
}

impl IncomingHandler for PredicateFilterHandler {
    fn name(&self) -> &str {
        "predicate-filter"
    }

    fn handle_commit(
        &self,
        commit: &Commit,
        graph: &mut dyn GraphStore,
    ) -> Result<HandlerOutcome, HandlerError> {
        let kept: Vec<Statement> = commit
            .added()
            .iter()
            .filter(|s| s.predicate() == self.predicate)
            .cloned()
            .collect();
        graph.add(&kept)?;
        if kept.len() == commit.addition_count() {
            Ok(HandlerOutcome::Applied)
        } else {
            let applied = Commit::merge_of(
                commit,
                commit.originating_branch().clone(),
                commit.preceding().cloned(),
                kept,
                Vec::new(),
            );
            Ok(HandlerOutcome::Narrowed(applied))
        }
    }
}

/// Accepts every commit without touching the graph.
pub struct IgnoreHandler;

impl IncomingHandler for IgnoreHandler {
    fn name(&self) -> &str {
        "ignore"
    }

    fn handle_commit(
        &self,
        _commit: &Commit,
        _graph: &mut dyn GraphStore,
    ) -> Result<HandlerOutcome, HandlerError> {
        Ok(HandlerOutcome::Applied)
    }
}

/// Signals `entered` on each call, then waits for `release` before applying.
pub struct GateHandler {
    pub entered: Sender<()>,
    pub release: Receiver<()>,
}

impl IncomingHandler for GateHandler {
    fn name(&self) -> &str {
        "gate"
    }

    fn handle_commit(
        &self,
        commit: &Commit,
        graph: &mut dyn GraphStore,
    ) -> Result<HandlerOutcome, HandlerError> {
        let _ = self.entered.send(());
        let _ = self.release.recv();
        ApplyHandler.handle_commit(commit, graph)
    }
}

pub struct FailingHandler;

impl IncomingHandler for FailingHandler {
    fn name(&self) -> &str {
        "failing"
    }

    fn handle_commit(
        &self,
        _commit: &Commit,
        _graph: &mut dyn GraphStore,
    ) -> Result<HandlerOutcome, HandlerError> {
        Err(HandlerError::failed("failing", "rejected"))
    }
}

/// For every new `(s, p, o)` addition, asserts `(s, type, Thing)`.
pub struct TypeService;

impl AugmentationService for TypeService {
    fn name(&self) -> &str {
        "type"
    }

    fn handle_from_offset(
        &self,
        commit: &Commit,
        add_offset: usize,
        _remove_offset: usize,
        graph: &mut dyn GraphStore,
    ) -> Result<(), HandlerError> {
        let inferred: Vec<Statement> = commit
            .added_since(add_offset)
            .filter(|s| s.predicate() != "type")
            .map(|s| st(s.subject(), "type", "Thing"))
            .collect();
        graph.add(&inferred)?;
        Ok(())
    }
}

/// Mirrors every new `p` addition as a `q` statement.
pub struct MirrorService;

impl AugmentationService for MirrorService {
    fn name(&self) -> &str {
        "mirror"
    }

    fn handle_from_offset(
        &self,
        commit: &Commit,
        add_offset: usize,
        _remove_offset: usize,
        graph: &mut dyn GraphStore,
    ) -> Result<(), HandlerError> {
        let mirrored: Vec<Statement> = commit
            .added_since(add_offset)
            .filter(|s| s.predicate() == "p")
            .map(|s| st(s.subject(), "q", s.object()))
            .collect();
        graph.add(&mirrored)?;
        Ok(())
    }
}

/// Retracts every new `q` addition.
pub struct RetractService;

impl AugmentationService for RetractService {
    fn name(&self) -> &str {
        "retract"
    }

    fn handle_from_offset(
        &self,
        commit: &Commit,
        add_offset: usize,
        _remove_offset: usize,
        graph: &mut dyn GraphStore,
    ) -> Result<(), HandlerError> {
        let retracted: Vec<Statement> = commit
            .added_since(add_offset)
            .filter(|s| s.predicate() == "q")
            .cloned()
            .collect();
        graph.remove(&retracted)?;
        Ok(())
    }
}

/// Adds a fresh statement on every call and never settles.
#[derive(Default)]
pub struct RestlessService {
    calls: AtomicUsize,
}

impl AugmentationService for RestlessService {
    fn name(&self) -> &str {
        "restless"
    }

    fn handle_from_offset(
        &self,
        _commit: &Commit,
        _add_offset: usize,
        _remove_offset: usize,
        graph: &mut dyn GraphStore,
    ) -> Result<(), HandlerError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        graph.add(&[st(&format!("gen{n}"), "p", "o")])?;
        Ok(())
    }
}

pub struct BrokenService;

impl AugmentationService for BrokenService {
    fn name(&self) -> &str {
        "broken"
    }

    fn handle_from_offset(
        &self,
        _commit: &Commit,
        _add_offset: usize,
        _remove_offset: usize,
        _graph: &mut dyn GraphStore,
    ) -> Result<(), HandlerError> {
        Err(HandlerError::failed("broken", "always fails"))
    }
}

/// Records every delivered commit; optionally rejects them all.
pub struct RecordingDestination {
    name: String,
    fail: bool,
    received: Mutex<Vec<Commit>>,
}

impl RecordingDestination {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: false,
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: true,
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn received(&self) -> Vec<Commit> {
        self.received.lock().clone()
    }

    pub fn received_ids(&self) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .map(|c| c.id().to_string())
            .collect()
    }
}

impl CommitDestination for RecordingDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, commit: Commit) -> Result<(), HandlerError> {
        if self.fail {
            return Err(HandlerError::DeliveryFailed {
                destination: self.name.clone(),
                commit_id: commit.id().to_string(),
                message: "unreachable".to_string(),
            });
        }
        self.received.lock().push(commit);
        Ok(())
    }
}
