//! Collaborator traits the branch engine plugs into.
//!
//! The engine never knows the concrete graph store, handlers, or durable
//! backends; it talks to them only through these seams.

pub mod graph;
pub mod handlers;
pub mod storage;

pub use graph::{GraphStore, MutationListener};
pub use handlers::{AugmentationService, CommitDestination, HandlerOutcome, IncomingHandler};
pub use storage::{DurableCache, DurableLog};
