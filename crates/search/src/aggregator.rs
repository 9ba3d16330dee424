//! Retrieval Aggregator
//!
//! Searches several collections with one query embedding and picks the
//! source label whose hits have the lowest mean distance. Only that source's
//! chunks make up the answer context.

use crate::index::VectorIndex;
use legalrag_common::embeddings::Embedder;
use legalrag_common::errors::{AppError, Result};
use legalrag_common::metrics;
use legalrag_common::models::ScoredChunk;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// The winning source and its concatenated context
#[derive(Debug, Clone, Serialize)]
pub struct BestSource {
    pub source: String,
    pub context: String,
    pub mean_distance: f32,
    pub chunk_count: usize,
}

/// Pick the best source from hits given in collection order, then
/// retrieval order within each collection.
///
/// Hits are grouped by `source_label`. The label with the minimum mean
/// distance wins; on a tie the label seen first wins. Context is every chunk
/// text with that label, in the given order, separated by a blank line.
pub fn select_best_source(hits: &[ScoredChunk]) -> Result<BestSource> {
    // (label, distance sum, count) in first-seen order
    let mut groups: Vec<(&str, f64, usize)> = Vec::new();
    for hit in hits {
        let label = hit.chunk.source_label.as_str();
        match groups.iter_mut().find(|(l, _, _)| *l == label) {
            Some(group) => {
                group.1 += hit.distance as f64;
                group.2 += 1;
            }
            None => groups.push((label, hit.distance as f64, 1)),
        }
    }

    let mut best: Option<(&str, f64)> = None;
    for (label, sum, count) in &groups {
        let mean = sum / *count as f64;
        if best.map_or(true, |(_, best_mean)| mean < best_mean) {
            best = Some((*label, mean));
        }
    }
    let (source, mean) = best.ok_or(AppError::NoMatchFound)?;

    let texts: Vec<&str> = hits
        .iter()
        .filter(|h| h.chunk.source_label == source)
        .map(|h| h.chunk.text.as_str())
        .collect();

    Ok(BestSource {
        source: source.to_string(),
        context: texts.join("\n\n"),
        mean_distance: mean as f32,
        chunk_count: texts.len(),
    })
}

/// Fans a query out over named collections
pub struct RetrievalAggregator {
    embedder: Arc<dyn Embedder>,
}

impl RetrievalAggregator {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Search every collection for `k` hits and select the best source
    #[instrument(skip(self, query, collections), fields(collections = collections.len()))]
    pub async fn answer_best_source(
        &self,
        query: &str,
        collections: &[(String, Arc<VectorIndex>)],
        k: usize,
    ) -> Result<BestSource> {
        let start = Instant::now();
        let query_vector = self.embedder.embed(query).await?;

        let mut hits = Vec::new();
        for (name, index) in collections {
            let found = index.search_by_vector(&query_vector, k)?;
            debug!(collection = %name, hits = found.len(), "Searched collection");
            hits.extend(found);
        }

        let best = select_best_source(&hits);
        metrics::record_retrieval(start.elapsed().as_secs_f64(), "library");
        let best = best?;

        debug!(
            source = %best.source,
            mean_distance = best.mean_distance,
            chunks = best.chunk_count,
            latency_ms = start.elapsed().as_millis() as u64,
            "Selected best source"
        );
        Ok(best)
    }

    /// Top `k` chunks from a single collection
    #[instrument(skip(self, query, index), fields(collection = index.collection()))]
    pub async fn retrieve(&self, query: &str, index: &VectorIndex, k: usize) -> Result<Vec<ScoredChunk>> {
        let start = Instant::now();
        let hits = index.search(query, k, self.embedder.as_ref()).await?;
        metrics::record_retrieval(start.elapsed().as_secs_f64(), "document");
        Ok(hits)
    }
}

/// Join retrieved chunk texts into one context block
pub fn join_context(hits: &[ScoredChunk]) -> String {
    hits.iter().map(|h| h.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use legalrag_common::models::Chunk;

    fn hit(label: &str, text: &str, distance: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk::new(text, label, Some(0)),
            distance,
        }
    }

    /// Embeds every query to the origin
    struct OriginEmbedder;

    #[async_trait]
    impl Embedder for OriginEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0, 0.0]).collect())
        }

        fn model_name(&self) -> &str {
            "origin"
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    /// Index whose chunks sit at the given squared distances from the origin
    fn index_at(label: &str, distances: &[f32]) -> Arc<VectorIndex> {
        let items = distances
            .iter()
            .enumerate()
            .map(|(i, d)| (Chunk::new(format!("{} chunk {}", label, i), label, Some(i)), vec![d.sqrt(), 0.0]))
            .collect();
        Arc::new(VectorIndex::from_parts(label, "origin", items).unwrap())
    }

    #[test]
    fn test_lowest_mean_wins() {
        let hits = vec![
            hit("Constitution", "Article 21", 0.40),
            hit("Constitution", "Article 14", 0.50),
            hit("IPC", "Section 379", 0.10),
            hit("IPC", "Section 378", 0.14),
        ];
        let best = select_best_source(&hits).unwrap();
        assert_eq!(best.source, "IPC");
        assert_eq!(best.context, "Section 379\n\nSection 378");
        assert!((best.mean_distance - 0.12).abs() < 1e-6);
    }

    #[test]
    fn test_mean_beats_single_lucky_hit() {
        let hits = vec![
            hit("Format", "lucky", 0.05),
            hit("Format", "noise", 0.95),
            hit("IPC", "steady", 0.30),
            hit("IPC", "steady too", 0.32),
        ];
        assert_eq!(select_best_source(&hits).unwrap().source, "IPC");
    }

    #[test]
    fn test_tie_goes_to_first_seen() {
        let hits = vec![hit("Guide", "a", 0.3), hit("legaldoc", "b", 0.3)];
        assert_eq!(select_best_source(&hits).unwrap().source, "Guide");

        let reversed = vec![hit("legaldoc", "b", 0.3), hit("Guide", "a", 0.3)];
        assert_eq!(select_best_source(&reversed).unwrap().source, "legaldoc");
    }

    #[test]
    fn test_shared_label_across_collections() {
        // Two physical collections carrying the same logical label
        let hits = vec![hit("IPC", "part one", 0.2), hit("Other", "x", 0.25), hit("IPC", "part two", 0.2)];
        let best = select_best_source(&hits).unwrap();
        assert_eq!(best.source, "IPC");
        assert_eq!(best.context, "part one\n\npart two");
    }

    #[test]
    fn test_no_hits() {
        assert!(matches!(select_best_source(&[]), Err(AppError::NoMatchFound)));
    }

    #[tokio::test]
    async fn test_penalty_for_theft_selects_ipc() {
        let aggregator = RetrievalAggregator::new(Arc::new(OriginEmbedder));
        let collections = vec![
            ("Constitution".to_string(), index_at("Constitution", &[0.40, 0.50])),
            ("IPC".to_string(), index_at("IPC", &[0.10, 0.14])),
        ];

        let best = aggregator
            .answer_best_source("What is the penalty for theft?", &collections, 5)
            .await
            .unwrap();

        assert_eq!(best.source, "IPC");
        assert_eq!(best.context, "IPC chunk 0\n\nIPC chunk 1");
        assert!((best.mean_distance - 0.12).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_empty_collections_is_no_match() {
        let aggregator = RetrievalAggregator::new(Arc::new(OriginEmbedder));
        let result = aggregator.answer_best_source("anything", &[], 5).await;
        assert!(matches!(result, Err(AppError::NoMatchFound)));
    }
}
