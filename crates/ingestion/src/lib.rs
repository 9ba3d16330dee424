//! LegalRAG ingestion
//!
//! PDF page extraction and adaptive chunking.

pub mod chunker;
pub mod errors;
pub mod pdf;
pub mod processor;

pub use chunker::{chunk_page, chunk_pages, ChunkingConfig};
pub use errors::IngestionError;
pub use processor::{DocumentProcessor, ProcessedDocument};
