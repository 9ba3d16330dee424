//! Open chat and plain-language summaries

use axum::{
    extract::{rejection::FormRejection, State},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::form::{non_blank, validated_form};
use crate::AppState;
use legalrag_common::errors::Result;

#[derive(Debug, Deserialize, Validate)]
pub struct ChatForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "query is required"))]
    pub query: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SummarizeForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "text is required"))]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

/// General legal chat, no retrieval
pub async fn chat(
    State(state): State<AppState>,
    form: std::result::Result<Form<ChatForm>, FormRejection>,
) -> Result<Json<ChatResponse>> {
    let form = validated_form(form)?;
    let query = non_blank(&form.query, "query")?;
    let response = state.generator.chat(query).await?;
    Ok(Json(ChatResponse { response }))
}

pub async fn summarize(
    State(state): State<AppState>,
    form: std::result::Result<Form<SummarizeForm>, FormRejection>,
) -> Result<Json<SummaryResponse>> {
    let form = validated_form(form)?;
    let summary = state.generator.summarize(&form.text).await?;
    Ok(Json(SummaryResponse { summary }))
}
