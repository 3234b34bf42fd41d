//! # graft-core
//!
//! Foundation crate for the Graft synchronization engine.
//! Defines statements, commits, the collaborator traits the engine plugs into,
//! errors, config, tracing setup, and constants.
//! Every other crate in the workspace depends on this.

pub mod commit;
pub mod config;
pub mod constants;
pub mod errors;
pub mod ids;
pub mod statement;
pub mod tracing;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use commit::Commit;
pub use config::GraftConfig;
pub use errors::{GraftError, GraftResult};
pub use ids::{BranchId, CommitId};
pub use statement::Statement;
