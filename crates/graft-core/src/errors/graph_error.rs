//! Graph store errors.

use super::error_code::{self, GraftErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("no transaction is active")]
    NoTransaction,

    #[error("transaction commit failed: {message}")]
    CommitFailed { message: String },

    #[error("graph store error: {message}")]
    Store { message: String },
}

impl GraftErrorCode for GraphError {
    fn error_code(&self) -> &'static str {
        error_code::GRAPH_ERROR
    }
}
