//! # graft-engine
//!
//! Per-branch commit pipeline. A [`Branch`] owns a graph, captures local
//! edits through a [`DiffAggregator`], turns them into commits augmented by
//! local services, persists them through a [`StateKeeper`], and forwards them
//! to other branches through a [`CommitStreamer`]. Incoming commits from other
//! branches are merged on a dedicated worker under the same single-writer
//! lock.

pub mod aggregator;
pub mod branch;
pub mod fixpoint;
pub mod graph;
pub mod state_keeper;
pub mod streamer;
mod work;

pub use aggregator::DiffAggregator;
pub use branch::{Branch, BranchBuilder, BranchDestination};
pub use fixpoint::{run_service_loop, FixpointOutcome};
pub use graph::MemoryGraph;
pub use state_keeper::StateKeeper;
pub use streamer::{CommitStreamer, StreamerStats};
