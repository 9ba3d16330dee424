//! Reference library
//!
//! The fixed set of statutes and guides every `/ask-existing` question is
//! answered against. Each document is resolved through the collection cache
//! as a pinned entry so the LRU never evicts it.

use crate::cache::CollectionCache;
use crate::index::VectorIndex;
use futures::stream::{self, StreamExt};
use legalrag_common::config::ReferenceDocument;
use legalrag_common::errors::Result;
use legalrag_common::models::{Chunk, CollectionId};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Loaded reference collections, in configured order
#[derive(Clone, Default)]
pub struct ReferenceLibrary {
    collections: Vec<(String, Arc<VectorIndex>)>,
}

impl ReferenceLibrary {
    /// Resolve every configured document, at most `concurrency` at a time.
    ///
    /// `loader` produces the chunks for a document that has no persisted
    /// index yet. A document that fails to load is logged and skipped; the
    /// remaining ones keep their configured order.
    pub async fn load<F, Fut>(
        cache: &CollectionCache,
        documents: &[ReferenceDocument],
        concurrency: usize,
        loader: F,
    ) -> Self
    where
        F: Fn(ReferenceDocument) -> Fut,
        Fut: Future<Output = Result<Vec<Chunk>>>,
    {
        let start = Instant::now();
        let loader = &loader;

        let results: Vec<_> = stream::iter(documents.to_vec())
            .map(|doc: ReferenceDocument| async move {
                let result = match CollectionId::named(doc.name.as_str()) {
                    Ok(id) => {
                        let owned = doc.clone();
                        cache.resolve_pinned(&id, move || loader(owned)).await
                    }
                    Err(e) => Err(e),
                };
                (doc, result)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let mut collections = Vec::with_capacity(results.len());
        for (doc, result) in results {
            match result {
                Ok(index) => {
                    info!(document = %doc.name, chunks = index.len(), "Reference document ready");
                    collections.push((doc.name, index));
                }
                Err(e) => {
                    warn!(
                        document = %doc.name,
                        path = %doc.path.display(),
                        error = %e,
                        "Skipping reference document"
                    );
                }
            }
        }

        info!(
            loaded = collections.len(),
            configured = documents.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Reference library loaded"
        );
        Self { collections }
    }

    pub fn from_collections(collections: Vec<(String, Arc<VectorIndex>)>) -> Self {
        Self { collections }
    }

    pub fn collections(&self) -> &[(String, Arc<VectorIndex>)] {
        &self.collections
    }

    pub fn names(&self) -> Vec<&str> {
        self.collections.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
