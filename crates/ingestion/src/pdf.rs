//! PDF text extraction module
//!
//! Extracts per-page text using lopdf. Line breaks are kept so the chunker
//! can split on paragraph and line boundaries.

use crate::errors::IngestionError;
use legalrag_common::models::PageText;
use std::path::Path;
use tracing::{debug, warn};

/// Extract the text of every page from in-memory PDF bytes
pub fn extract_pages(bytes: &[u8], source_name: &str) -> Result<Vec<PageText>, IngestionError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| IngestionError::PdfParseError {
        source_name: source_name.to_string(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(source = source_name, page_count = pages.len(), "Extracting text from PDF");

    let mut result = Vec::with_capacity(pages.len());
    for (index, page_num) in pages.keys().enumerate() {
        let text = match doc.extract_text(&[*page_num]) {
            Ok(raw) => normalize_page_text(&raw),
            Err(e) => {
                warn!(source = source_name, page = page_num, error = %e, "Failed to extract text from page, skipping");
                String::new()
            }
        };
        result.push(PageText::new(index, text));
    }

    if result.iter().all(|p| p.text.trim().is_empty()) {
        return Err(IngestionError::EmptyDocument(source_name.to_string()));
    }

    Ok(result)
}

/// Extract pages from a PDF on disk
pub fn extract_pages_from_file(path: &Path) -> Result<Vec<PageText>, IngestionError> {
    if !path.exists() {
        return Err(IngestionError::FileNotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    extract_pages(&bytes, &path.display().to_string())
}

/// Clean extracted page text
fn normalize_page_text(text: &str) -> String {
    let text = text
        .replace("\r\n", "\n")
        .replace(['\r', '\u{FEFF}', '\0'], "");

    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        // Collapse runs of spaces within a line
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() && lines.last().is_some_and(|l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }

    lines.join("\n").trim().to_string()
}
