//! Top-level Graft configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ChunkingConfig, EngineConfig, StorageConfig};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`GRAFT_*`)
/// 2. Project config (`graft.toml` in the project root)
/// 3. User config (`~/.graft/config.toml`)
/// 4. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GraftConfig {
    pub engine: EngineConfig,
    pub chunking: ChunkingConfig,
    pub storage: StorageConfig,
}

impl GraftConfig {
    /// Load configuration for the project rooted at `root`.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Lowest priority: user config. A broken user file is reported,
        // a missing one is not.
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                Self::merge_toml_file(&mut config, &user_config_path)?;
            }
        }

        let project_config_path = root.join("graft.toml");
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config);
        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &GraftConfig) -> Result<(), ConfigError> {
        let positive = [
            ("engine.incoming_queue_capacity", config.engine.incoming_queue_capacity),
            ("engine.outgoing_queue_capacity", config.engine.outgoing_queue_capacity),
            ("engine.max_fixpoint_rounds", config.engine.max_fixpoint_rounds),
            ("chunking.batch_size", config.chunking.batch_size),
            ("chunking.max_payload_bytes", config.chunking.max_payload_bytes),
        ];
        for (field, value) in positive {
            if value == Some(0) {
                return Err(ConfigError::ValidationFailed {
                    field: field.to_string(),
                    message: "must be greater than 0".to_string(),
                });
            }
        }
        Ok(())
    }

    fn user_config_path() -> Option<std::path::PathBuf> {
        home_dir().map(|h| h.join(".graft").join("config.toml"))
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are ignored.
    fn merge_toml_file(config: &mut GraftConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: GraftConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins wherever it has a value.
    fn merge(base: &mut GraftConfig, other: &GraftConfig) {
        // Engine
        if other.engine.incoming_queue_capacity.is_some() {
            base.engine.incoming_queue_capacity = other.engine.incoming_queue_capacity;
        }
        if other.engine.outgoing_queue_capacity.is_some() {
            base.engine.outgoing_queue_capacity = other.engine.outgoing_queue_capacity;
        }
        if other.engine.max_fixpoint_rounds.is_some() {
            base.engine.max_fixpoint_rounds = other.engine.max_fixpoint_rounds;
        }

        // Chunking
        if other.chunking.batch_size.is_some() {
            base.chunking.batch_size = other.chunking.batch_size;
        }
        if other.chunking.max_payload_bytes.is_some() {
            base.chunking.max_payload_bytes = other.chunking.max_payload_bytes;
        }

        // Storage
        if other.storage.database_path.is_some() {
            base.storage.database_path = other.storage.database_path.clone();
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `GRAFT_ENGINE_MAX_FIXPOINT_ROUNDS`, `GRAFT_CHUNKING_BATCH_SIZE`, etc.
    fn apply_env_overrides(config: &mut GraftConfig) {
        let usize_var = |name: &str| -> Option<usize> {
            std::env::var(name).ok().and_then(|v| v.parse::<usize>().ok())
        };

        if let Some(v) = usize_var("GRAFT_ENGINE_INCOMING_QUEUE_CAPACITY") {
            config.engine.incoming_queue_capacity = Some(v);
        }
        if let Some(v) = usize_var("GRAFT_ENGINE_OUTGOING_QUEUE_CAPACITY") {
            config.engine.outgoing_queue_capacity = Some(v);
        }
        if let Some(v) = usize_var("GRAFT_ENGINE_MAX_FIXPOINT_ROUNDS") {
            config.engine.max_fixpoint_rounds = Some(v);
        }
        if let Some(v) = usize_var("GRAFT_CHUNKING_BATCH_SIZE") {
            config.chunking.batch_size = Some(v);
        }
        if let Some(v) = usize_var("GRAFT_CHUNKING_MAX_PAYLOAD_BYTES") {
            config.chunking.max_payload_bytes = Some(v);
        }
        if let Ok(val) = std::env::var("GRAFT_STORAGE_DATABASE_PATH") {
            config.storage.database_path = Some(val);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<std::path::PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(std::path::PathBuf::from)
}
