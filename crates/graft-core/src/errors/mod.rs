//! Error handling for Graft.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod error_code;
pub mod graft_error;
pub mod graph_error;
pub mod handler_error;
pub mod storage_error;

pub use config_error::ConfigError;
pub use error_code::GraftErrorCode;
pub use graft_error::{GraftError, GraftResult};
pub use graph_error::GraphError;
pub use handler_error::HandlerError;
pub use storage_error::StorageError;
