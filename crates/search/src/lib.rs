//! LegalRAG Search
//!
//! Flat vector indexes persisted per collection, an LRU collection cache
//! with single-flight builds, and best-source retrieval across the
//! reference library.

pub mod aggregator;
pub mod cache;
pub mod index;
pub mod library;
pub mod store;

pub use aggregator::{join_context, select_best_source, BestSource, RetrievalAggregator};
pub use cache::{CollectionCache, Tier};
pub use index::VectorIndex;
pub use library::ReferenceLibrary;
pub use store::IndexStore;
