//! Document collection identifiers

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 of raw file bytes, hex encoded
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn looks_like_hash(value: &str) -> bool {
    value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Stable key naming one indexed document's chunk set.
///
/// Identical bytes always map to the same `ContentHash`, which is what lets
/// repeated uploads reuse a persisted index instead of re-embedding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CollectionId {
    /// Fixed logical name of a preloaded reference document
    Named(String),
    /// Digest of an uploaded document's bytes
    ContentHash(String),
}

impl CollectionId {
    /// Logical name for a reference document.
    ///
    /// The name becomes a directory under the storage root, so separators,
    /// parent references and control characters are rejected. So is a name
    /// shaped like a content hash, which would share an upload's directory.
    pub fn named(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed.contains("..")
            || trimmed.contains(['/', '\\'])
            || trimmed.chars().any(char::is_control)
            || looks_like_hash(trimmed)
        {
            return Err(AppError::Validation {
                message: format!("invalid collection name '{}'", name),
                field: Some("name".to_string()),
            });
        }
        Ok(CollectionId::Named(trimmed.to_string()))
    }

    /// Identifier derived from document bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        CollectionId::ContentHash(content_hash(bytes))
    }

    /// Identifier from a previously returned `file_id`
    pub fn from_hash(hash: &str) -> Result<Self> {
        let hash = hash.trim();
        if !looks_like_hash(hash) {
            return Err(AppError::Validation {
                message: format!("'{}' is not a valid file id", hash),
                field: Some("file_id".to_string()),
            });
        }
        Ok(CollectionId::ContentHash(hash.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            CollectionId::Named(name) => name,
            CollectionId::ContentHash(hash) => hash,
        }
    }

    /// Directory name under the storage root
    pub fn dir_name(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
