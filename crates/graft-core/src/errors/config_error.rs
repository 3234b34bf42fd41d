//! Configuration errors.
//!
//! Besides config loading, this covers misuse of a branch's configuration at
//! runtime: both are fatal to the triggering call and never retried.

use super::error_code::{self, GraftErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Config parse error in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Config validation failed for {field}: {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Branch {branch} is deactivated")]
    Deactivated { branch: String },

    #[error("Branch {branch} has no incoming commit handlers registered")]
    NoIncomingHandlers { branch: String },
}

impl GraftErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Deactivated { .. } => error_code::BRANCH_DEACTIVATED,
            Self::NoIncomingHandlers { .. } => error_code::NO_INCOMING_HANDLERS,
            _ => error_code::CONFIG_ERROR,
        }
    }
}
