//! Retrievable text units

use serde::{Deserialize, Serialize};

/// Text of one document page, as produced by the PDF loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// Zero-based page position in the source document
    pub index: usize,
    pub text: String,
}

impl PageText {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self { index, text: text.into() }
    }

    /// Page length in characters (not bytes)
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Immutable unit of retrievable text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk content
    pub text: String,

    /// Label of the document collection this chunk came from
    pub source_label: String,

    /// Page the chunk was cut from, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_index: Option<usize>,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source_label: impl Into<String>, page_index: Option<usize>) -> Self {
        Self {
            text: text.into(),
            source_label: source_label.into(),
            page_index,
        }
    }
}

/// A chunk returned from similarity search.
///
/// `distance` is a metric distance: lower is a closer match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub distance: f32,
}
