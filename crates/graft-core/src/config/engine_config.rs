//! Branch engine configuration.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Configuration for branch queues and the service fixpoint loop.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of the incoming work queue. Default: 1024.
    pub incoming_queue_capacity: Option<usize>,
    /// Capacity of the outgoing work queue. Default: 1024.
    pub outgoing_queue_capacity: Option<usize>,
    /// Round cap for the service fixpoint loop. Default: 10.
    pub max_fixpoint_rounds: Option<usize>,
}

impl EngineConfig {
    pub fn effective_incoming_queue_capacity(&self) -> usize {
        self.incoming_queue_capacity
            .unwrap_or(constants::DEFAULT_QUEUE_CAPACITY)
    }

    pub fn effective_outgoing_queue_capacity(&self) -> usize {
        self.outgoing_queue_capacity
            .unwrap_or(constants::DEFAULT_QUEUE_CAPACITY)
    }

    pub fn effective_max_fixpoint_rounds(&self) -> usize {
        self.max_fixpoint_rounds
            .unwrap_or(constants::DEFAULT_MAX_FIXPOINT_ROUNDS)
    }
}
