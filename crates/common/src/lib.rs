//! LegalRAG Common Library
//!
//! Shared code for the LegalRAG crates including:
//! - Data model (chunks, collection ids, clause records)
//! - Embedding and generative model clients
//! - Answer generation and clause parsing
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod context;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod resilience;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use llm::LanguageModel;
pub use models::{Chunk, ClauseRecord, CollectionId, PageText, ScoredChunk};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "embedding-001";

/// Default generative model
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-pro";

/// Embedding dimension used by the mock provider
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
