//! MemoryGraph: in-memory reference `GraphStore`.

use std::collections::BTreeSet;
use std::sync::Arc;

use graft_core::errors::GraphError;
use graft_core::traits::{GraphStore, MutationListener};
use graft_core::Statement;

#[derive(Debug)]
enum Undo {
    Added(Statement),
    Removed(Statement),
}

/// Statement set with nested transactions and synchronous listeners.
///
/// Each open transaction keeps an undo log. Reverting (on `abort`, or on
/// `end` without `commit`) restores the statements without notifying
/// listeners.
#[derive(Default)]
pub struct MemoryGraph {
    statements: BTreeSet<Statement>,
    listeners: Vec<Arc<dyn MutationListener>>,
    frames: Vec<Vec<Undo>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current statements, sorted.
    pub fn statements(&self) -> Vec<Statement> {
        self.statements.iter().cloned().collect()
    }

    fn record(&mut self, undo: Undo) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push(undo);
        }
    }

    fn revert(&mut self, undo: Vec<Undo>) {
        for entry in undo.into_iter().rev() {
            match entry {
                Undo::Added(s) => {
                    self.statements.remove(&s);
                }
                Undo::Removed(s) => {
                    self.statements.insert(s);
                }
            }
        }
    }
}

impl GraphStore for MemoryGraph {
    fn begin(&mut self) {
        self.frames.push(Vec::new());
    }

    fn commit(&mut self) -> Result<(), GraphError> {
        let depth = self.frames.len();
        let frame = self.frames.last_mut().ok_or(GraphError::NoTransaction)?;
        let undo = std::mem::take(frame);
        // A nested commit stays revertible by its parent.
        if depth > 1 {
            self.frames[depth - 2].extend(undo);
        }
        Ok(())
    }

    fn abort(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            let undo = std::mem::take(frame);
            self.revert(undo);
        }
    }

    fn end(&mut self) {
        if let Some(undo) = self.frames.pop() {
            self.revert(undo);
        }
    }

    fn add(&mut self, statements: &[Statement]) -> Result<(), GraphError> {
        for s in statements {
            if self.statements.insert(s.clone()) {
                self.record(Undo::Added(s.clone()));
                for listener in &self.listeners {
                    listener.on_added(s);
                }
            }
        }
        Ok(())
    }

    fn remove(&mut self, statements: &[Statement]) -> Result<(), GraphError> {
        for s in statements {
            if self.statements.remove(s) {
                self.record(Undo::Removed(s.clone()));
                for listener in &self.listeners {
                    listener.on_removed(s);
                }
            }
        }
        Ok(())
    }

    fn contains(&self, statement: &Statement) -> bool {
        self.statements.contains(statement)
    }

    fn len(&self) -> usize {
        self.statements.len()
    }

    fn transaction_depth(&self) -> usize {
        self.frames.len()
    }

    fn subscribe(&mut self, listener: Arc<dyn MutationListener>) {
        self.listeners.push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiffAggregator;

    fn st(s: &str) -> Statement {
        Statement::new(s, "p", "o")
    }

    #[test]
    fn end_without_commit_reverts() {
        let mut g = MemoryGraph::new();
        g.add(&[st("keep")]).unwrap();
        g.begin();
        g.add(&[st("x")]).unwrap();
        g.remove(&[st("keep")]).unwrap();
        g.end();
        assert!(g.contains(&st("keep")));
        assert!(!g.contains(&st("x")));
        assert_eq!(g.transaction_depth(), 0);
    }

    #[test]
    fn outer_abort_reverts_nested_commit() {
        let mut g = MemoryGraph::new();
        g.begin();
        g.begin();
        g.add(&[st("x")]).unwrap();
        g.commit().unwrap();
        g.end();
        assert!(g.contains(&st("x")));
        g.abort();
        g.end();
        assert!(g.is_empty());
    }

    #[test]
    fn commit_without_transaction_fails() {
        let mut g = MemoryGraph::new();
        assert!(matches!(g.commit(), Err(GraphError::NoTransaction)));
    }

    #[test]
    fn listeners_see_effective_changes_only() {
        let agg = Arc::new(DiffAggregator::new());
        let mut g = MemoryGraph::new();
        g.subscribe(agg.clone());
        g.add(&[st("a"), st("a")]).unwrap();
        g.remove(&[st("missing")]).unwrap();
        assert_eq!(agg.retrieve_added().len(), 1);
        assert!(!agg.has_removals());
    }
}
