//! Document processor
//!
//! PDF bytes or files in, page texts and labeled chunks out. PDF parsing is
//! CPU-bound and runs on the blocking pool.

use crate::chunker::chunk_pages;
use crate::errors::IngestionError;
use crate::pdf::{extract_pages, extract_pages_from_file};
use legalrag_common::metrics;
use legalrag_common::models::{Chunk, PageText};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// A parsed and chunked document
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub pages: Vec<PageText>,
    pub chunks: Vec<Chunk>,
}

/// Turns PDFs into chunks ready for indexing
#[derive(Debug, Clone, Default)]
pub struct DocumentProcessor;

impl DocumentProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Extract page texts from uploaded bytes
    pub async fn pages_from_bytes(&self, bytes: Arc<[u8]>, source_name: &str) -> Result<Vec<PageText>, IngestionError> {
        let name = source_name.to_string();
        tokio::task::spawn_blocking(move || extract_pages(&bytes, &name))
            .await
            .map_err(|e| IngestionError::TaskFailed(e.to_string()))?
    }

    /// Extract page texts from a file
    pub async fn pages_from_file(&self, path: &Path) -> Result<Vec<PageText>, IngestionError> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || extract_pages_from_file(&path))
            .await
            .map_err(|e| IngestionError::TaskFailed(e.to_string()))?
    }

    /// Chunk already extracted pages, labeling every chunk with `source_label`
    pub fn chunk(&self, pages: &[PageText], source_label: &str) -> Result<Vec<Chunk>, IngestionError> {
        let chunks = chunk_pages(pages, source_label)?;
        if chunks.is_empty() {
            return Err(IngestionError::EmptyDocument(source_label.to_string()));
        }
        metrics::record_chunks(chunks.len());
        Ok(chunks)
    }

    /// Parse and chunk uploaded bytes
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn process_bytes(&self, bytes: Arc<[u8]>, source_label: &str) -> Result<ProcessedDocument, IngestionError> {
        let pages = self.pages_from_bytes(bytes, source_label).await?;
        let chunks = self.chunk(&pages, source_label)?;
        info!(pages = pages.len(), chunks = chunks.len(), "Document processed");
        Ok(ProcessedDocument { pages, chunks })
    }

    /// Parse and chunk a file on disk
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn process_file(&self, path: &Path, source_label: &str) -> Result<ProcessedDocument, IngestionError> {
        let pages = self.pages_from_file(path).await?;
        let chunks = self.chunk(&pages, source_label)?;
        info!(pages = pages.len(), chunks = chunks.len(), "Document processed");
        Ok(ProcessedDocument { pages, chunks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_bytes_fail_cleanly() {
        let processor = DocumentProcessor::new();
        let result = processor.process_bytes(Arc::from(&b"<html>not a pdf</html>"[..]), "upload").await;
        assert!(matches!(result, Err(IngestionError::PdfParseError { .. })));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let processor = DocumentProcessor::new();
        let result = processor.process_file(Path::new("data/does-not-exist.pdf"), "IPC").await;
        assert!(matches!(result, Err(IngestionError::FileNotFound(_))));
    }

    #[test]
    fn test_chunk_requires_text() {
        let processor = DocumentProcessor::new();
        let pages = vec![PageText::new(0, "   ")];
        assert!(matches!(processor.chunk(&pages, "blank"), Err(IngestionError::EmptyDocument(_))));

        let pages = vec![PageText::new(0, "Order XXXIX Temporary injunctions")];
        let chunks = processor.chunk(&pages, "Guide to Litigation in India").unwrap();
        assert_eq!(chunks[0].source_label, "Guide to Litigation in India");
    }
}
