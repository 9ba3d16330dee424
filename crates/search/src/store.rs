//! Index store: one directory per collection under a storage root

use crate::index::{VectorIndex, INDEX_FILE};
use legalrag_common::embeddings::Embedder;
use legalrag_common::errors::{AppError, Result};
use legalrag_common::metrics;
use legalrag_common::models::{Chunk, CollectionId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Builds, persists and reloads vector indexes
#[derive(Clone)]
pub struct IndexStore {
    root: PathBuf,
    embedder: Arc<dyn Embedder>,
}

impl IndexStore {
    pub fn new(root: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            root: root.into(),
            embedder,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Directory holding the persisted index for `id`
    pub fn path_for(&self, id: &CollectionId) -> PathBuf {
        self.root.join(id.dir_name())
    }

    pub fn exists(&self, id: &CollectionId) -> bool {
        self.path_for(id).join(INDEX_FILE).exists()
    }

    /// Load a persisted index, `None` when nothing is on disk for `id`
    #[instrument(skip(self), fields(collection = %id))]
    pub async fn load(&self, id: &CollectionId) -> Result<Option<Arc<VectorIndex>>> {
        let dir = self.path_for(id);
        let loaded = tokio::task::spawn_blocking(move || VectorIndex::load(&dir))
            .await
            .map_err(|e| AppError::Internal {
                message: format!("index load task failed: {}", e),
            })?;

        match loaded {
            Ok(index) => {
                if index.embedding_model() != self.embedder.model_name() {
                    warn!(
                        stored = index.embedding_model(),
                        current = self.embedder.model_name(),
                        "Index was built with a different embedding model"
                    );
                }
                info!(chunks = index.len(), tier = "disk", "Loaded vector index");
                Ok(Some(Arc::new(index)))
            }
            Err(AppError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Embed `chunks`, persist the index, and return it
    #[instrument(skip(self, chunks), fields(collection = %id, chunks = chunks.len()))]
    pub async fn build_and_persist(&self, id: &CollectionId, chunks: Vec<Chunk>) -> Result<Arc<VectorIndex>> {
        let start = Instant::now();
        let chunk_count = chunks.len();

        let index = match VectorIndex::build(id, chunks, self.embedder.as_ref()).await {
            Ok(index) => Arc::new(index),
            Err(e) => {
                metrics::record_index_build(start.elapsed().as_secs_f64(), chunk_count, false);
                return Err(e);
            }
        };

        let dir = self.path_for(id);
        let to_persist = index.clone();
        tokio::task::spawn_blocking(move || to_persist.persist(&dir))
            .await
            .map_err(|e| AppError::Internal {
                message: format!("index persist task failed: {}", e),
            })??;

        metrics::record_index_build(start.elapsed().as_secs_f64(), chunk_count, true);
        info!(
            chunks = chunk_count,
            latency_ms = start.elapsed().as_millis() as u64,
            "Built and persisted vector index"
        );
        Ok(index)
    }
}
