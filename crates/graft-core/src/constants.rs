//! Shared constants for the Graft sync engine.

/// Graft version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Statements per physical payload before a commit is split into batches.
pub const DEFAULT_BATCH_SIZE: usize = 4_000;

/// Maximum serialized size of one physical payload in bytes.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1_000_000;

/// Maximum rounds of the service fixpoint loop.
pub const DEFAULT_MAX_FIXPOINT_ROUNDS: usize = 10;

/// Capacity of the per-branch incoming and outgoing work queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

// ---- Persisted state keys (namespaced by branch) ----

pub const KEY_LAST_PROCESSED_INCOMING: &str = "last_processed_incoming_commit";
pub const KEY_PRELIMINARY_COMMIT_ID: &str = "last_open_preliminary_commit_id";
pub const KEY_PRELIMINARY_COMMIT_CONTENT: &str = "last_open_preliminary_commit_content";
pub const KEY_LAST_PRODUCED: &str = "last_produced_commit";
pub const KEY_LAST_FORWARDED: &str = "last_forwarded_commit";
