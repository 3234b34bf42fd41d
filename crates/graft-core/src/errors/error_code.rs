//! GraftErrorCode trait for stable, machine-readable error codes.

/// Every error enum implements this to expose a structured code string
/// alongside its human-readable message.
pub trait GraftErrorCode {
    /// Returns the error code string (e.g., "STORAGE_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted error string: `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const BRANCH_DEACTIVATED: &str = "BRANCH_DEACTIVATED";
pub const NO_INCOMING_HANDLERS: &str = "NO_INCOMING_HANDLERS";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const SERIALIZATION_ERROR: &str = "SERIALIZATION_ERROR";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
pub const GRAPH_ERROR: &str = "GRAPH_ERROR";
pub const HANDLER_ERROR: &str = "HANDLER_ERROR";
pub const WORKER_SPAWN_FAILED: &str = "WORKER_SPAWN_FAILED";
