//! Core data model shared by every LegalRAG crate

mod chunk;
mod clause;
mod collection;

pub use chunk::{Chunk, PageText, ScoredChunk};
pub use clause::{ClauseRecord, RiskLevel, NOT_SPECIFIED};
pub use collection::{content_hash, CollectionId};
