//! Embedding service abstraction
//!
//! Provides a unified interface for multiple embedding providers:
//! - Gemini (embedding-001, text-embedding-004)
//! - OpenAI (text-embedding-3-small, text-embedding-ada-002)
//! - Mock (deterministic vectors for development and tests)

use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::resilience::{with_retry, RemoteFailure, RetryPolicy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch).
    ///
    /// Either every text is embedded or the whole call fails.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension, 0 when only known after the first call
    fn dimension(&self) -> usize;
}

fn embedding_error(message: String) -> AppError {
    AppError::EmbeddingError { message }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

fn retry_policy(config: &EmbeddingConfig) -> RetryPolicy {
    RetryPolicy::new(config.max_retries, Duration::from_secs(config.timeout_secs * 2))
}

fn check_count(expected: usize, got: usize) -> std::result::Result<(), RemoteFailure> {
    if expected != got {
        return Err(RemoteFailure::permanent(embedding_error(format!(
            "Malformed response: requested {} embeddings, received {}",
            expected, got
        ))));
    }
    Ok(())
}

/// Gemini embedding client (`batchEmbedContents`)
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    batch_size: usize,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct GeminiBatchRequest<'a> {
    requests: Vec<GeminiEmbedRequest<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiEmbedRequest<'a> {
    model: &'a str,
    content: GeminiContent<'a>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiBatchResponse {
    #[serde(default)]
    embeddings: Vec<GeminiEmbedding>,
}

#[derive(Deserialize)]
struct GeminiEmbedding {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    /// Create a new Gemini embedder
    pub fn new(api_key: String, config: &EmbeddingConfig) -> Result<Self> {
        let model = if config.model.starts_with("models/") {
            config.model.clone()
        } else {
            format!("models/{}", config.model)
        };

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key,
            model,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            batch_size: config.batch_size.clamp(1, 100),
            retry: retry_policy(config),
        })
    }

    async fn make_request(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, RemoteFailure> {
        let url = format!("{}/{}:batchEmbedContents", self.base_url, self.model);

        let request = GeminiBatchRequest {
            requests: texts
                .iter()
                .map(|text| GeminiEmbedRequest {
                    model: &self.model,
                    content: GeminiContent { parts: [GeminiPart { text }] },
                })
                .collect(),
        };

        let response = self.client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteFailure::from_request(&e, embedding_error))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteFailure::from_status(status, &body, embedding_error));
        }

        let result: GeminiBatchResponse = response.json().await.map_err(|e| {
            RemoteFailure::permanent(embedding_error(format!("Failed to parse response: {}", e)))
        })?;

        check_count(texts.len(), result.embeddings.len())?;
        Ok(result.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings.into_iter().next().ok_or_else(|| AppError::EmbeddingError {
            message: "Empty response".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let start = Instant::now();
            let result = with_retry(&self.retry, "gemini_embed", || self.make_request(batch)).await;
            metrics::record_embedding(start.elapsed().as_secs_f64(), &self.model, batch.len(), result.is_ok());
            all_embeddings.extend(result?);
        }

        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        match self.model.as_str() {
            "models/embedding-001" | "models/text-embedding-004" => 768,
            "models/gemini-embedding-001" => 3072,
            _ => 0,
        }
    }
}

/// OpenAI-compatible embedding client (`/embeddings`)
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
    batch_size: usize,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    data: Vec<OpenAIEmbedding>,
}

#[derive(Deserialize)]
struct OpenAIEmbedding {
    embedding: Vec<f32>,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder
    pub fn new(api_key: String, config: &EmbeddingConfig) -> Result<Self> {
        let dimension = match config.model.as_str() {
            "text-embedding-ada-002" => 1536,
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            _ => 0,
        };

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key,
            model: config.model.clone(),
            dimension,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            batch_size: config.batch_size.max(1),
            retry: retry_policy(config),
        })
    }

    async fn make_request(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, RemoteFailure> {
        let url = format!("{}/embeddings", self.base_url);

        let request = OpenAIRequest {
            input: texts,
            model: &self.model,
        };

        let response = self.client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteFailure::from_request(&e, embedding_error))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteFailure::from_status(status, &body, embedding_error));
        }

        let result: OpenAIResponse = response.json().await.map_err(|e| {
            RemoteFailure::permanent(embedding_error(format!("Failed to parse response: {}", e)))
        })?;

        check_count(texts.len(), result.data.len())?;
        Ok(result.data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings.into_iter().next().ok_or_else(|| AppError::EmbeddingError {
            message: "Empty response".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let start = Instant::now();
            let result = with_retry(&self.retry, "openai_embed", || self.make_request(batch)).await;
            metrics::record_embedding(start.elapsed().as_secs_f64(), &self.model, batch.len(), result.is_ok());
            all_embeddings.extend(result?);
        }

        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Mock embedder for development and testing.
///
/// Vectors are derived from a SHA-256 of the text, so the same text always
/// embeds to the same unit vector across processes.
pub struct MockEmbedder {
    dimension: usize,
    batches: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            batches: AtomicUsize::new(0),
        }
    }

    /// Number of `embed_batch` calls served so far
    pub fn batch_calls(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut values = Vec::with_capacity(self.dimension);
        let mut counter = 0u32;
        while values.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(counter.to_le_bytes());
            hasher.update(text.as_bytes());
            for pair in hasher.finalize().chunks_exact(2) {
                if values.len() == self.dimension {
                    break;
                }
                let raw = u16::from_le_bytes([pair[0], pair[1]]) as f32;
                values.push(raw / u16::MAX as f32 - 0.5);
            }
            counter += 1;
        }

        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        values
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let require_key = || {
        config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: format!("embedding provider '{}' requires an API key", config.provider),
            })
    };

    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiEmbedder::new(require_key()?, config)?)),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(require_key()?, config)?)),
        "mock" => Ok(Arc::new(MockEmbedder::new(crate::DEFAULT_EMBEDDING_DIMENSION))),
        other => Err(AppError::Configuration {
            message: format!("unknown embedding provider '{}'", other),
        }),
    }
}
