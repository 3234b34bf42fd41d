//! Commit chunking: splitting commits into size-bounded physical payloads
//! for the durable log, and regrouping them on load.

pub mod assembler;
pub mod payload;
pub mod splitter;

pub use assembler::CommitAssembler;
pub use payload::CommitPayload;
pub use splitter::CommitSplitter;
