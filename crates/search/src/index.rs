//! Flat vector index
//!
//! Exhaustive nearest-neighbour search over one collection's chunks using
//! squared Euclidean distance (lower is closer). Persisted as a single
//! `index.json` per collection directory.

use chrono::{DateTime, Utc};
use legalrag_common::embeddings::Embedder;
use legalrag_common::errors::{AppError, Result};
use legalrag_common::models::{Chunk, CollectionId, ScoredChunk};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Bumped whenever the on-disk layout changes
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// File holding the serialized index inside a collection directory
pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedIndex {
    format_version: u32,
    collection: String,
    embedding_model: String,
    dimension: usize,
    created_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
}

/// In-memory index for one document collection
#[derive(Debug, Clone)]
pub struct VectorIndex {
    collection: String,
    embedding_model: String,
    dimension: usize,
    created_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Embed every chunk and build an index.
    ///
    /// Fails as a whole if embedding fails or returns vectors of mixed or
    /// wrong counts; no partial index is ever returned.
    pub async fn build(collection: &CollectionId, chunks: Vec<Chunk>, embedder: &dyn Embedder) -> Result<Self> {
        if chunks.is_empty() {
            return Err(AppError::validation(format!(
                "collection '{}' has no chunks to index",
                collection
            )));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(AppError::EmbeddingError {
                message: format!("requested {} embeddings, received {}", chunks.len(), vectors.len()),
            });
        }

        Self::from_parts(
            collection.as_str(),
            embedder.model_name(),
            chunks.into_iter().zip(vectors).collect(),
        )
    }

    /// Assemble an index from already embedded chunks
    pub fn from_parts(collection: &str, embedding_model: &str, items: Vec<(Chunk, Vec<f32>)>) -> Result<Self> {
        let dimension = items.first().map(|(_, v)| v.len()).unwrap_or(0);
        if dimension == 0 {
            return Err(AppError::EmbeddingError {
                message: "embedding service returned empty vectors".to_string(),
            });
        }
        if let Some((chunk, v)) = items.iter().find(|(_, v)| v.len() != dimension) {
            return Err(AppError::EmbeddingError {
                message: format!(
                    "inconsistent embedding dimension: expected {}, got {} for chunk from page {:?}",
                    dimension,
                    v.len(),
                    chunk.page_index
                ),
            });
        }

        Ok(Self {
            collection: collection.to_string(),
            embedding_model: embedding_model.to_string(),
            dimension,
            created_at: Utc::now(),
            entries: items.into_iter().map(|(chunk, vector)| IndexEntry { chunk, vector }).collect(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `k` nearest chunks to `query`, closest first
    pub fn search_by_vector(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dimension {
            return Err(AppError::EmbeddingError {
                message: format!(
                    "query has {} dimensions, index '{}' has {}",
                    query.len(),
                    self.collection,
                    self.dimension
                ),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, squared_l2(query, &e.vector)))
            .collect();
        // Stable sort keeps insertion order among equal distances
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, distance)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                distance,
            })
            .collect())
    }

    /// Embed `query` and search
    pub async fn search(&self, query: &str, k: usize, embedder: &dyn Embedder) -> Result<Vec<ScoredChunk>> {
        let vector = embedder.embed(query).await?;
        self.search_by_vector(&vector, k)
    }

    /// Write the index under `dir`.
    ///
    /// The file is written into a sibling temporary directory which is then
    /// renamed into place. If `dir` already exists the write is discarded:
    /// collection ids are content-derived, so the existing index is equivalent.
    pub fn persist(&self, dir: &Path) -> Result<()> {
        let parent = dir
            .parent()
            .ok_or_else(|| AppError::storage(format!("invalid index path {}", dir.display())))?;
        fs::create_dir_all(parent)?;

        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        // Removed on drop unless it is renamed into place
        let tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.tmp-", dir_name))
            .tempdir_in(parent)?;

        let persisted = PersistedIndex {
            format_version: INDEX_FORMAT_VERSION,
            collection: self.collection.clone(),
            embedding_model: self.embedding_model.clone(),
            dimension: self.dimension,
            created_at: self.created_at,
            entries: self.entries.clone(),
        };

        let file = fs::File::create(tmp.path().join(INDEX_FILE))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &persisted)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        if dir.join(INDEX_FILE).exists() {
            tmp.close()?;
            return Ok(());
        }

        if let Err(e) = fs::rename(tmp.path(), dir) {
            tmp.close()?;
            // Lost a race with another writer of the same collection
            if dir.join(INDEX_FILE).exists() {
                return Ok(());
            }
            return Err(AppError::storage(format!(
                "failed to move index into {}: {}",
                dir.display(),
                e
            )));
        }
        Ok(())
    }

    /// Read an index persisted under `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(INDEX_FILE);
        if !path.exists() {
            return Err(AppError::NotFound {
                resource_type: "vector_index".to_string(),
                id: dir.display().to_string(),
            });
        }

        let file = fs::File::open(&path)?;
        let persisted: PersistedIndex = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| AppError::storage(format!("corrupt index {}: {}", path.display(), e)))?;

        if persisted.format_version != INDEX_FORMAT_VERSION {
            return Err(AppError::storage(format!(
                "index {} has format version {}, expected {}",
                path.display(),
                persisted.format_version,
                INDEX_FORMAT_VERSION
            )));
        }
        if persisted.entries.iter().any(|e| e.vector.len() != persisted.dimension) {
            return Err(AppError::storage(format!(
                "index {} has vectors that do not match dimension {}",
                path.display(),
                persisted.dimension
            )));
        }

        Ok(Self {
            collection: persisted.collection,
            embedding_model: persisted.embedding_model,
            dimension: persisted.dimension,
            created_at: persisted.created_at,
            entries: persisted.entries,
        })
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use legalrag_common::embeddings::MockEmbedder;
    use tempfile::TempDir;

    fn chunk(text: &str) -> Chunk {
        Chunk::new(text, "IPC", Some(0))
    }

    fn small_index() -> VectorIndex {
        VectorIndex::from_parts(
            "IPC",
            "test-model",
            vec![
                (chunk("far"), vec![3.0, 0.0]),
                (chunk("near"), vec![1.0, 0.0]),
                (chunk("middle"), vec![2.0, 0.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_search_orders_by_distance() {
        let index = small_index();
        let results = index.search_by_vector(&[0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text, "near");
        assert_eq!(results[1].chunk.text, "middle");
        assert!((results[0].distance - 1.0).abs() < 1e-6);
        assert!((results[1].distance - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_k_larger_than_index() {
        let results = small_index().search_by_vector(&[0.0, 0.0], 10).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(small_index().search_by_vector(&[0.0, 0.0, 0.0], 1).is_err());
        let mixed = VectorIndex::from_parts("x", "m", vec![(chunk("a"), vec![1.0]), (chunk("b"), vec![1.0, 2.0])]);
        assert!(matches!(mixed, Err(AppError::EmbeddingError { .. })));
    }

    #[tokio::test]
    async fn test_build_and_search_with_mock_embedder() {
        let embedder = MockEmbedder::new(16);
        let id = CollectionId::named("IPC").unwrap();
        let chunks = vec![chunk("Section 379. Punishment for theft."), chunk("Section 302. Punishment for murder.")];
        let index = VectorIndex::build(&id, chunks, &embedder).await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.embedding_model(), "mock-embedding");

        // A chunk's own text embeds to its own vector, distance zero
        let hits = index.search("Section 379. Punishment for theft.", 1, &embedder).await.unwrap();
        assert_eq!(hits[0].chunk.text, "Section 379. Punishment for theft.");
        assert!(hits[0].distance < 1e-6);
    }

    #[tokio::test]
    async fn test_build_rejects_empty() {
        let embedder = MockEmbedder::new(8);
        let id = CollectionId::from_bytes(b"empty");
        tokio_test::assert_err!(VectorIndex::build(&id, Vec::new(), &embedder).await);
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("IPC");
        let index = small_index();

        index.persist(&dir).unwrap();
        assert!(dir.join(INDEX_FILE).exists());

        let loaded = VectorIndex::load(&dir).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.dimension(), 2);
        assert_eq!(loaded.embedding_model(), "test-model");
        assert_eq!(
            loaded.search_by_vector(&[0.0, 0.0], 3).unwrap(),
            index.search_by_vector(&[0.0, 0.0], 3).unwrap()
        );

        // No temporary directories left behind
        let leftovers = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_persist_keeps_existing_index() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("IPC");
        small_index().persist(&dir).unwrap();

        let other = VectorIndex::from_parts("IPC", "other-model", vec![(chunk("x"), vec![9.0, 9.0])]).unwrap();
        other.persist(&dir).unwrap();
        assert_eq!(VectorIndex::load(&dir).unwrap().embedding_model(), "test-model");
        // The discarded write is cleaned up
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_load_missing_and_corrupt() {
        let tmp = TempDir::new().unwrap();
        let missing = VectorIndex::load(&tmp.path().join("absent"));
        assert!(matches!(missing, Err(AppError::NotFound { .. })));

        let dir = tmp.path().join("broken");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(INDEX_FILE), b"{ not json").unwrap();
        assert!(matches!(VectorIndex::load(&dir), Err(AppError::Storage { .. })));
    }

    #[test]
    fn test_load_rejects_other_format_version() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("old");
        fs::create_dir_all(&dir).unwrap();
        let body = serde_json::json!({
            "format_version": 99,
            "collection": "old",
            "embedding_model": "m",
            "dimension": 1,
            "created_at": "2024-01-01T00:00:00Z",
            "entries": []
        });
        fs::write(dir.join(INDEX_FILE), body.to_string()).unwrap();
        assert!(matches!(VectorIndex::load(&dir), Err(AppError::Storage { .. })));
    }
}
