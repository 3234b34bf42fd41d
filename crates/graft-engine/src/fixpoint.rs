//! Service fixpoint loop: lets augmentation services react to a commit, and
//! to each other, until nothing new appears or the round cap is hit.

use std::sync::Arc;

use graft_core::traits::{AugmentationService, GraphStore};
use graft_core::Commit;
use tracing::{debug, warn};

use crate::aggregator::DiffAggregator;

/// How a service loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixpointOutcome {
    pub rounds: usize,
    /// False when the round cap stopped the loop.
    pub converged: bool,
}

/// Run `services` over `commit` until a round adds nothing.
///
/// Each service sees the statements appended since its own previous call,
/// including the output of services that ran after it. Graph edits a service
/// makes are captured by `aggregator` and appended to the commit right after
/// the call. A failing service is logged; whatever it changed before failing
/// is kept. Finally, statements that ended up both added and removed beyond
/// the pre-loop prefix are cancelled.
pub fn run_service_loop(
    commit: &mut Commit,
    services: &[Arc<dyn AugmentationService>],
    graph: &mut dyn GraphStore,
    aggregator: &DiffAggregator,
    max_rounds: usize,
) -> FixpointOutcome {
    let base = (commit.addition_count(), commit.removal_count());
    let mut offsets = vec![(0usize, 0usize); services.len()];
    let mut rounds = 0;
    let mut converged = false;

    while rounds < max_rounds {
        rounds += 1;
        let before = (commit.addition_count(), commit.removal_count());

        for (service, offset) in services.iter().zip(offsets.iter_mut()) {
            if let Err(e) = service.handle_from_offset(commit, offset.0, offset.1, graph) {
                warn!(
                    commit_id = %commit.id(),
                    service = service.name(),
                    error = %e,
                    "augmentation service failed"
                );
            }
            commit.append_added(aggregator.retrieve_added());
            commit.append_removed(aggregator.retrieve_removed());
            *offset = (commit.addition_count(), commit.removal_count());
        }

        if (commit.addition_count(), commit.removal_count()) == before {
            converged = true;
            break;
        }
    }

    if converged {
        debug!(commit_id = %commit.id(), rounds, "service loop converged");
    } else {
        warn!(
            commit_id = %commit.id(),
            rounds,
            "service loop hit the round cap, continuing with partial augmentation"
        );
    }

    commit.remove_effectless_statements(base.0, base.1);
    FixpointOutcome { rounds, converged }
}
