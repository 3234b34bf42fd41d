//! Top-level error aggregating subsystem errors via `From` conversions.

use super::error_code::{self, GraftErrorCode};
use super::{ConfigError, GraphError, HandlerError, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum GraftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("failed to spawn worker {name}: {message}")]
    WorkerSpawn { name: String, message: String },
}

pub type GraftResult<T> = Result<T, GraftError>;

impl GraftErrorCode for GraftError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::Graph(e) => e.error_code(),
            Self::Handler(e) => e.error_code(),
            Self::WorkerSpawn { .. } => error_code::WORKER_SPAWN_FAILED,
        }
    }
}
