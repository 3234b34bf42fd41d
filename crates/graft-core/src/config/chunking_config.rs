//! Commit chunking configuration.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Thresholds for splitting commits into physical log payloads.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Statements per batch once a commit is split. Default: 4000.
    pub batch_size: Option<usize>,
    /// Maximum serialized payload size in bytes. Default: 1_000_000.
    pub max_payload_bytes: Option<usize>,
}

impl ChunkingConfig {
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.unwrap_or(constants::DEFAULT_BATCH_SIZE)
    }

    pub fn effective_max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
            .unwrap_or(constants::DEFAULT_MAX_PAYLOAD_BYTES)
    }
}
