//! Generative model abstraction
//!
//! "Prompt in, text out". Providers:
//! - Gemini (`generateContent`)
//! - OpenAI-compatible chat completions
//! - Mock (echo, for development and tests)

use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::resilience::{with_retry, RemoteFailure, RetryPolicy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-call sampling options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 2048,
        }
    }
}

/// Trait for text generation
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for a single-turn prompt
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

fn generation_error(message: String) -> AppError {
    AppError::GenerationError { message }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Gemini `generateContent` client
pub struct GeminiModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [GeminiContent<'a>; 1],
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: [GeminiTextPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiTextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

impl GeminiModel {
    pub fn new(api_key: String, config: &GenerationConfig) -> Result<Self> {
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
            retry: RetryPolicy::new(config.max_retries, Duration::from_secs(config.timeout_secs)),
        })
    }

    async fn make_request(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> std::result::Result<String, RemoteFailure> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        let request = GenerateContentRequest {
            contents: [GeminiContent {
                role: "user",
                parts: [GeminiTextPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
            },
        };

        let response = self.client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteFailure::from_request(&e, generation_error))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteFailure::from_status(status, &body, generation_error));
        }

        let result: GenerateContentResponse = response.json().await.map_err(|e| {
            RemoteFailure::permanent(generation_error(format!("Failed to parse response: {}", e)))
        })?;

        let text: String = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(RemoteFailure::permanent(generation_error(
                "Empty response from model".to_string(),
            )));
        }
        Ok(text)
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let start = Instant::now();
        let result = with_retry(&self.retry, "gemini_generate", || self.make_request(prompt, options)).await;
        metrics::record_generation(start.elapsed().as_secs_f64(), &self.model, result.is_ok());
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// OpenAI-compatible chat completions client
pub struct OpenAIModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAIModel {
    pub fn new(api_key: String, config: &GenerationConfig) -> Result<Self> {
        let base = config
            .api_base
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            retry: RetryPolicy::new(config.max_retries, Duration::from_secs(config.timeout_secs)),
        })
    }

    async fn make_request(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> std::result::Result<String, RemoteFailure> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            max_tokens: options.max_output_tokens,
            temperature: options.temperature,
        };

        let response = self.client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteFailure::from_request(&e, generation_error))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteFailure::from_status(status, &body, generation_error));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            RemoteFailure::permanent(generation_error(format!("Failed to parse LLM response: {}", e)))
        })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| RemoteFailure::permanent(generation_error("Empty response from LLM".to_string())))
    }
}

#[async_trait]
impl LanguageModel for OpenAIModel {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let start = Instant::now();
        let result = with_retry(&self.retry, "openai_generate", || self.make_request(prompt, options)).await;
        metrics::record_generation(start.elapsed().as_secs_f64(), &self.model, result.is_ok());
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Offline model that answers with a fixed reply, or echoes the question
pub struct MockModel {
    reply: Option<String>,
    latency: Duration,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            reply: None,
            latency: Duration::ZERO,
        }
    }

    /// Always answer with `reply`
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            latency: Duration::ZERO,
        }
    }

    /// Wait `latency` before every answer
    pub fn delayed(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(reply) = &self.reply {
            return Ok(reply.clone());
        }

        let question = prompt
            .lines()
            .rev()
            .find_map(|line| {
                let line = line.trim();
                line.strip_prefix("User Question:")
                    .or_else(|| line.strip_prefix("Question:"))
                    .map(str::trim)
            })
            .unwrap_or("your request");

        Ok(format!(
            "Mock answer about \"{}\" [generation provider not configured]",
            question
        ))
    }

    fn model_name(&self) -> &str {
        "mock-generation"
    }
}

/// Create a language model based on configuration
pub fn create_language_model(config: &GenerationConfig) -> Result<Arc<dyn LanguageModel>> {
    let require_key = || {
        config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: format!("generation provider '{}' requires an API key", config.provider),
            })
    };

    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiModel::new(require_key()?, config)?)),
        "openai" => Ok(Arc::new(OpenAIModel::new(require_key()?, config)?)),
        "mock" => Ok(Arc::new(MockModel::new())),
        other => Err(AppError::Configuration {
            message: format!("unknown generation provider '{}'", other),
        }),
    }
}
