//! DiffAggregator: coalesces graph mutation notifications into a net diff.

use graft_core::traits::MutationListener;
use graft_core::Statement;
use indexmap::IndexSet;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Pending {
    added: IndexSet<Statement>,
    removed: IndexSet<Statement>,
}

/// Net add/remove sets since the last drain.
///
/// Adding a statement that is pending removal (or removing one pending
/// addition) cancels the pair instead of recording both.
#[derive(Debug, Default)]
pub struct DiffAggregator {
    pending: Mutex<Pending>,
}

impl DiffAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain pending additions, in the order they were first seen.
    pub fn retrieve_added(&self) -> IndexSet<Statement> {
        std::mem::take(&mut self.pending.lock().added)
    }

    /// Drain pending removals, in the order they were first seen.
    pub fn retrieve_removed(&self) -> IndexSet<Statement> {
        std::mem::take(&mut self.pending.lock().removed)
    }

    pub fn has_additions(&self) -> bool {
        !self.pending.lock().added.is_empty()
    }

    pub fn has_removals(&self) -> bool {
        !self.pending.lock().removed.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        let pending = self.pending.lock();
        !pending.added.is_empty() || !pending.removed.is_empty()
    }

    /// Drop everything pending.
    pub fn discard(&self) {
        let mut pending = self.pending.lock();
        pending.added.clear();
        pending.removed.clear();
    }
}

impl MutationListener for DiffAggregator {
    fn on_added(&self, statement: &Statement) {
        let mut pending = self.pending.lock();
        if pending.removed.is_empty() || !pending.removed.shift_remove(statement) {
            pending.added.insert(statement.clone());
        }
    }

    fn on_removed(&self, statement: &Statement) {
        let mut pending = self.pending.lock();
        if pending.added.is_empty() || !pending.added.shift_remove(statement) {
            pending.removed.insert(statement.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn st(s: &str) -> Statement {
        Statement::new(s, "p", "o")
    }

    #[test]
    fn add_then_remove_cancels() {
        let agg = DiffAggregator::new();
        agg.on_added(&st("s"));
        agg.on_removed(&st("s"));
        assert!(!agg.has_pending());
    }

    #[test]
    fn remove_then_add_cancels() {
        let agg = DiffAggregator::new();
        agg.on_removed(&st("s"));
        agg.on_added(&st("s"));
        assert!(!agg.has_pending());
    }

    #[test]
    fn add_remove_add_nets_one_addition() {
        let agg = DiffAggregator::new();
        agg.on_added(&st("s"));
        agg.on_removed(&st("s"));
        agg.on_added(&st("s"));
        assert_eq!(agg.retrieve_added().into_iter().collect::<Vec<_>>(), vec![st("s")]);
        assert!(!agg.has_removals());
    }

    #[test]
    fn different_statements_are_independent() {
        let agg = DiffAggregator::new();
        agg.on_removed(&st("x"));
        agg.on_added(&st("y"));
        assert!(agg.has_additions());
        assert!(agg.has_removals());
    }

    #[test]
    fn retrieve_drains() {
        let agg = DiffAggregator::new();
        agg.on_added(&st("a"));
        assert_eq!(agg.retrieve_added().len(), 1);
        assert!(agg.retrieve_added().is_empty());
    }

    proptest! {
        // Any interleaving of adds and removes of one statement nets out to
        // the sign of the last pairwise-uncancelled operation.
        #[test]
        fn single_statement_cancellation(ops in prop::collection::vec(any::<bool>(), 0..20)) {
            let agg = DiffAggregator::new();
            let mut net: i32 = 0;
            for add in &ops {
                if *add {
                    agg.on_added(&st("s"));
                    net = if net < 0 { net + 1 } else { 1 };
                } else {
                    agg.on_removed(&st("s"));
                    net = if net > 0 { net - 1 } else { -1 };
                }
            }
            prop_assert_eq!(agg.has_additions(), net > 0);
            prop_assert_eq!(agg.has_removals(), net < 0);
        }
    }
}
