//! Durable log and cache errors.

use super::error_code::{self, GraftErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("migration failed at version {version}: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("serialization failed: {message}")]
    Serialization { message: String },

    #[error("durable {resource} unavailable: {message}")]
    Unavailable { resource: String, message: String },
}

impl StorageError {
    pub fn serialization(err: impl std::fmt::Display) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl GraftErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MigrationFailed { .. } => error_code::MIGRATION_FAILED,
            Self::Serialization { .. } => error_code::SERIALIZATION_ERROR,
            _ => error_code::STORAGE_ERROR,
        }
    }
}
