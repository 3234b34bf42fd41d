//! Query modules, one per table family.

pub mod commit_log;
pub mod state_cache;
