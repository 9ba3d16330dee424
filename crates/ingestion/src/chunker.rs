//! Text chunking module
//!
//! Splits each page independently with parameters chosen from the page's
//! length. `text-splitter` prefers the largest semantic unit that fits:
//! paragraph breaks, then line breaks, sentences, words and characters.

use crate::errors::IngestionError;
use legalrag_common::models::{Chunk, PageText};
use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

/// Chunk size and overlap, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    /// Adaptive parameters for a page of `chars` characters
    pub fn for_page_length(chars: usize) -> Self {
        match chars {
            0..=999 => Self { chunk_size: 400, chunk_overlap: 50 },
            1000..=2999 => Self { chunk_size: 700, chunk_overlap: 100 },
            _ => Self { chunk_size: 1000, chunk_overlap: 120 },
        }
    }
}

/// Split one page into chunks labeled with `source_label`.
///
/// Every chunk is a contiguous slice of the page text. A page shorter than
/// its chunk size becomes a single chunk holding the whole page; blank pages
/// yield nothing.
pub fn chunk_page(page: &PageText, source_label: &str) -> Result<Vec<Chunk>, IngestionError> {
    if page.text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let length = page.char_len();
    let config = ChunkingConfig::for_page_length(length);

    if length < config.chunk_size {
        return Ok(vec![Chunk::new(page.text.clone(), source_label, Some(page.index))]);
    }

    let chunk_config = ChunkConfig::new(config.chunk_size)
        .with_overlap(config.chunk_overlap)
        .map_err(|e| IngestionError::ChunkingError(e.to_string()))?
        .with_trim(true);
    let splitter = TextSplitter::new(chunk_config);

    let chunks: Vec<Chunk> = splitter
        .chunks(&page.text)
        .filter(|c| !c.trim().is_empty())
        .map(|c| Chunk::new(c, source_label, Some(page.index)))
        .collect();

    debug!(
        page = page.index,
        page_chars = length,
        chunk_size = config.chunk_size,
        chunk_count = chunks.len(),
        "Page chunked"
    );

    Ok(chunks)
}

/// Split every page of a document; chunks never span two pages
pub fn chunk_pages(pages: &[PageText], source_label: &str) -> Result<Vec<Chunk>, IngestionError> {
    let mut chunks = Vec::new();
    for page in pages {
        chunks.extend(chunk_page(page, source_label)?);
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legal_text(chars: usize) -> String {
        let sentence = "Whoever intending to take dishonestly any movable property commits theft. ";
        let mut text = String::new();
        let mut n = 0;
        while text.len() < chars {
            text.push_str(sentence);
            n += 1;
            if n % 4 == 0 {
                text.push('\n');
            }
        }
        text.truncate(chars);
        text
    }

    #[test]
    fn test_chunk_size_steps() {
        assert_eq!(ChunkingConfig::for_page_length(0).chunk_size, 400);
        assert_eq!(ChunkingConfig::for_page_length(999).chunk_size, 400);
        assert_eq!(ChunkingConfig::for_page_length(1000).chunk_size, 700);
        assert_eq!(ChunkingConfig::for_page_length(2999).chunk_size, 700);
        assert_eq!(ChunkingConfig::for_page_length(3000).chunk_size, 1000);
        assert_eq!(ChunkingConfig::for_page_length(3000).chunk_overlap, 120);

        let mut prev = 0;
        for len in (0..10_000).step_by(250) {
            let size = ChunkingConfig::for_page_length(len).chunk_size;
            assert!(size >= prev);
            prev = size;
        }
    }

    #[test]
    fn test_short_page_is_one_chunk() {
        let page = PageText::new(3, "Article 21. Protection of life and personal liberty.");
        let chunks = chunk_page(&page, "Constitution of India").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, page.text);
        assert_eq!(chunks[0].source_label, "Constitution of India");
        assert_eq!(chunks[0].page_index, Some(3));
    }

    #[test]
    fn test_chunks_are_substrings_of_their_page() {
        let pages = vec![PageText::new(0, legal_text(5000)), PageText::new(1, legal_text(1500))];
        let chunks = chunk_pages(&pages, "IPC").unwrap();
        assert!(chunks.len() > 2);

        for chunk in &chunks {
            let page = &pages[chunk.page_index.unwrap()];
            let limit = ChunkingConfig::for_page_length(page.char_len()).chunk_size;
            assert!(page.text.contains(&chunk.text));
            assert!(chunk.text.chars().count() <= limit);
            assert_eq!(chunk.source_label, "IPC");
        }
        assert!(chunks.iter().any(|c| c.page_index == Some(1)));
    }

    #[test]
    fn test_blank_pages_are_skipped() {
        let pages = vec![PageText::new(0, "  \n "), PageText::new(1, "Schedule A")];
        let chunks = chunk_pages(&pages, "Format").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page_index, Some(1));
    }
}
