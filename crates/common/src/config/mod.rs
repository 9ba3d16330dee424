//! Configuration management for LegalRAG services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Generative model configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Vector index storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Retrieval parameters
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Preloaded reference documents
    #[serde(default)]
    pub library: LibraryConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds (covers remote model calls)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: gemini, openai, mock
    #[serde(default = "default_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Generation provider: gemini, openai, mock
    #[serde(default = "default_provider")]
    pub provider: String,

    /// API key for the generative model
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Temperature for question answering and chat
    #[serde(default = "default_answer_temperature")]
    pub answer_temperature: f32,

    /// Temperature for clause extraction and comparison
    #[serde(default = "default_clause_temperature")]
    pub clause_temperature: f32,

    /// Maximum output tokens
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_generation_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding one persisted index per collection
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// Uploaded collections kept in memory before LRU eviction
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Chunks fetched per reference collection
    #[serde(default = "default_library_top_k")]
    pub library_top_k: usize,

    /// Chunks fetched from a single uploaded document
    #[serde(default = "default_document_top_k")]
    pub document_top_k: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Reference documents, in search order
    #[serde(default = "default_library_documents")]
    pub documents: Vec<ReferenceDocument>,

    /// How many documents are prepared at once during preload
    #[serde(default = "default_preload_concurrency")]
    pub preload_concurrency: usize,
}

/// A named reference PDF
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReferenceDocument {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_request_timeout() -> u64 { 900 }
fn default_max_upload_bytes() -> usize { 25 * 1024 * 1024 }
fn default_max_concurrent() -> usize { 64 }
fn default_provider() -> String { "gemini".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_batch_size() -> usize { 100 }
fn default_generation_model() -> String { crate::DEFAULT_GENERATION_MODEL.to_string() }
fn default_answer_temperature() -> f32 { 0.3 }
fn default_clause_temperature() -> f32 { 0.2 }
fn default_max_output_tokens() -> u32 { 2048 }
fn default_generation_timeout() -> u64 { 120 }
fn default_generation_retries() -> u32 { 2 }
fn default_storage_root() -> PathBuf { PathBuf::from("vectorstores") }
fn default_cache_capacity() -> usize { 64 }
fn default_library_top_k() -> usize { 5 }
fn default_document_top_k() -> usize { 4 }
fn default_preload_concurrency() -> usize { 2 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "legalrag".to_string() }

fn default_library_documents() -> Vec<ReferenceDocument> {
    [
        ("Guide to Litigation in India", "data/Guide-to-Litigation-in-India.pdf"),
        ("Legal Compliance & Corporate Laws", "data/Legal-Compliance-Corporate-Laws.pdf"),
        ("legaldoc", "data/legaldoc.pdf"),
        ("Constitution of India", "data/constitution_of_india.pdf"),
        ("IPC", "data/penal_code.pdf"),
        ("Format", "data/format.pdf"),
    ]
    .into_iter()
    .map(|(name, path)| ReferenceDocument {
        name: name.to_string(),
        path: PathBuf::from(path),
    })
    .collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_retries(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            api_base: None,
            model: default_generation_model(),
            answer_temperature: default_answer_temperature(),
            clause_temperature: default_clause_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_generation_timeout(),
            max_retries: default_generation_retries(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            library_top_k: default_library_top_k(),
            document_top_k: default_document_top_k(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            documents: default_library_documents(),
            preload_concurrency: default_preload_concurrency(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8001
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        let mut config: Self = config.try_deserialize()?;
        config.apply_key_fallback(std::env::var("GEMINI_API_KEY").ok());
        Ok(config)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let mut config: Self = config.try_deserialize()?;
        config.apply_key_fallback(std::env::var("GEMINI_API_KEY").ok());
        Ok(config)
    }

    /// Use a shared provider key for any section that has none
    fn apply_key_fallback(&mut self, key: Option<String>) {
        let Some(key) = key.filter(|k| !k.trim().is_empty()) else {
            return;
        };
        if self.embedding.api_key.is_none() {
            self.embedding.api_key = Some(key.clone());
        }
        if self.generation.api_key.is_none() {
            self.generation.api_key = Some(key);
        }
    }

    /// Get request timeout as Duration.
    ///
    /// Never shorter than one fully retried embedding call followed by one
    /// fully retried generation call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs.max(self.upstream_budget_secs()))
    }

    fn upstream_budget_secs(&self) -> u64 {
        let attempts = |retries: u32| u64::from(retries) + 1;
        self.embedding.timeout_secs * attempts(self.embedding.max_retries)
            + self.generation.timeout_secs * attempts(self.generation.max_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.embedding.model, "embedding-001");
        assert_eq!(config.retrieval.library_top_k, 5);
        assert!((config.generation.clause_temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_default_library_order() {
        let config = AppConfig::default();
        let names: Vec<&str> = config.library.documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names.first(), Some(&"Guide to Litigation in India"));
        assert!(names.contains(&"IPC"));
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn test_request_timeout_covers_retried_upstream_calls() {
        let mut config = AppConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(900));

        // 30s x 4 embedding attempts + 120s x 3 generation attempts
        config.server.request_timeout_secs = 120;
        assert_eq!(config.request_timeout(), Duration::from_secs(480));
    }

    #[test]
    fn test_key_fallback_fills_only_missing() {
        let mut config = AppConfig::default();
        config.embedding.api_key = Some("explicit".to_string());
        config.apply_key_fallback(Some("shared".to_string()));
        assert_eq!(config.embedding.api_key.as_deref(), Some("explicit"));
        assert_eq!(config.generation.api_key.as_deref(), Some("shared"));
    }

    #[test]
    fn test_key_fallback_ignores_blank() {
        let mut config = AppConfig::default();
        config.apply_key_fallback(Some("  ".to_string()));
        assert!(config.generation.api_key.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(
                "[storage]\ncache_capacity = 3\n\n[[library.documents]]\nname = \"IPC\"\npath = \"data/penal_code.pdf\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.storage.cache_capacity, 3);
        assert_eq!(config.storage.root, PathBuf::from("vectorstores"));
        assert_eq!(config.library.documents.len(), 1);
        assert_eq!(config.library.preload_concurrency, 2);
        assert_eq!(config.server.port, 8000);
    }
}
