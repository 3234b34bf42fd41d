//! Mutable graph store and its mutation notifications.

use std::sync::Arc;

use crate::errors::GraphError;
use crate::statement::Statement;

/// Synchronous observer of graph mutations.
///
/// Called from inside `GraphStore::add` / `GraphStore::remove`, on the thread
/// performing the mutation, once per statement that actually changed the
/// graph.
pub trait MutationListener: Send + Sync {
    fn on_added(&self, statement: &Statement);
    fn on_removed(&self, statement: &Statement);
}

/// Transactional statement store owned by exactly one branch.
///
/// Transactions nest. `begin` opens a scope; `commit` makes the scope's
/// changes permanent relative to its parent; `abort` reverts them; `end`
/// closes the scope, reverting anything neither committed nor aborted.
/// Mutations outside any scope apply immediately.
pub trait GraphStore: Send {
    fn begin(&mut self);

    /// Make the innermost scope's changes permanent relative to its parent.
    ///
    /// The engine calls this only after the commit was appended to the
    /// durable log. A failure here leaves the log ahead of the graph: the
    /// commit stays recorded, is forwarded on the next restart, and its
    /// graph edits are reverted when the scope ends.
    fn commit(&mut self) -> Result<(), GraphError>;

    fn abort(&mut self);

    fn end(&mut self);

    /// Insert statements. Statements already present are not re-notified.
    fn add(&mut self, statements: &[Statement]) -> Result<(), GraphError>;

    /// Delete statements. Statements not present are not re-notified.
    fn remove(&mut self, statements: &[Statement]) -> Result<(), GraphError>;

    fn contains(&self, statement: &Statement) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Depth of the open transaction stack. Zero when none is open.
    fn transaction_depth(&self) -> usize;

    fn subscribe(&mut self, listener: Arc<dyn MutationListener>);
}
