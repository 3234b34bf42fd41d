//! Pluggable commit handlers: incoming merge handlers, local augmentation
//! services, and outgoing destinations.

use crate::commit::Commit;
use crate::errors::HandlerError;
use crate::traits::GraphStore;

/// What an incoming handler did with a delivered commit.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    /// The commit was applied as delivered (or the handler had nothing to do).
    Applied,
    /// Only part of the commit was applied; carries the commit describing
    /// what the handler actually applied.
    Narrowed(Commit),
}

/// Applies a commit received from another branch to the local graph.
///
/// Every registered handler receives the original delivered commit, in
/// registration order, inside a single graph write transaction.
pub trait IncomingHandler: Send + Sync {
    fn name(&self) -> &str;

    fn handle_commit(
        &self,
        commit: &Commit,
        graph: &mut dyn GraphStore,
    ) -> Result<HandlerOutcome, HandlerError>;
}

/// Local service that augments a commit by editing the graph.
///
/// The engine captures the graph edits a service makes and appends them to
/// the commit after each call. Services never mutate the commit directly.
pub trait AugmentationService: Send + Sync {
    fn name(&self) -> &str;

    /// Full pass over the whole commit.
    fn handle_commit(&self, commit: &Commit, graph: &mut dyn GraphStore) -> Result<(), HandlerError> {
        self.handle_from_offset(commit, 0, 0, graph)
    }

    /// Incremental pass over the statements at or after the given offsets.
    fn handle_from_offset(
        &self,
        commit: &Commit,
        add_offset: usize,
        remove_offset: usize,
        graph: &mut dyn GraphStore,
    ) -> Result<(), HandlerError>;
}

/// Receiver of commits forwarded by a branch's streamer.
///
/// Delivery is at-least-once; implementations must be idempotent by
/// commit id.
pub trait CommitDestination: Send + Sync {
    fn name(&self) -> &str;

    fn deliver(&self, commit: Commit) -> Result<(), HandlerError>;
}
