//! Configuration system for Graft.
//! TOML-based, layered resolution, every field optional with compiled defaults.

pub mod chunking_config;
pub mod engine_config;
pub mod graft_config;
pub mod storage_config;

pub use chunking_config::ChunkingConfig;
pub use engine_config::EngineConfig;
pub use graft_config::GraftConfig;
pub use storage_config::StorageConfig;
