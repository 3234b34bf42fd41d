//! Storage backend configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the SQLite database. `None` means in-memory.
    pub database_path: Option<String>,
}
