//! Answer Generator - renders a prompt and calls the generative model

use super::prompts::{Prompt, PromptKind};
use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};
use crate::llm::{GenerationOptions, LanguageModel};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Prompt-and-generate against a remote model.
///
/// Q&A, chat and summaries share one low temperature; clause extraction and
/// comparison use a slightly lower one.
pub struct AnswerGenerator {
    model: Arc<dyn LanguageModel>,
    answer_options: GenerationOptions,
    clause_options: GenerationOptions,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn LanguageModel>, config: &GenerationConfig) -> Self {
        Self {
            model,
            answer_options: GenerationOptions {
                temperature: config.answer_temperature,
                max_output_tokens: config.max_output_tokens,
            },
            clause_options: GenerationOptions {
                temperature: config.clause_temperature,
                max_output_tokens: config.max_output_tokens,
            },
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Render `prompt` and return the model's reply
    #[instrument(skip_all, fields(prompt = prompt.name()))]
    pub async fn generate(&self, prompt: Prompt<'_>) -> Result<String> {
        let options = match prompt.kind() {
            PromptKind::Answer => &self.answer_options,
            PromptKind::Clause => &self.clause_options,
        };

        let start = Instant::now();
        let text = self.model.generate(&prompt.render(), options).await?;

        tracing::debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            chars = text.len(),
            "Generated response"
        );
        Ok(text)
    }

    /// Answer from excerpts chosen by the retrieval aggregator
    pub async fn answer_with_excerpts(&self, question: &str, context: &str) -> Result<String> {
        self.generate(Prompt::GroundedAnswer { context, question }).await
    }

    /// Answer from the chunks of one uploaded document
    pub async fn answer_from_document(&self, question: &str, context: &str) -> Result<String> {
        self.generate(Prompt::DocumentAnswer { context, question }).await
    }

    /// Open chat, no retrieval
    pub async fn chat(&self, question: &str) -> Result<String> {
        self.generate(Prompt::OpenChat { question }).await
    }

    /// Plain-language summary of legal text
    pub async fn summarize(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(AppError::Validation {
                message: "No text provided.".to_string(),
                field: Some("text".to_string()),
            });
        }
        self.generate(Prompt::Summary { text }).await
    }
}
