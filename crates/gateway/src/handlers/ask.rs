//! Question answering handlers
//!
//! - `/ask-existing` answers from the best-matching reference document
//! - `/ask-upload` indexes an uploaded PDF (or reuses its cached index)
//! - `/ask-context` follows up on a previously uploaded PDF by id

use axum::{
    extract::{multipart::Multipart, rejection::FormRejection, State},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::form::{non_blank, validated_form, MultipartForm};
use crate::AppState;
use legalrag_common::{
    errors::{AppError, Result},
    models::CollectionId,
};
use legalrag_search::join_context;

#[derive(Debug, Deserialize, Validate)]
pub struct AskForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "query is required"))]
    pub query: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AskContextForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "query is required"))]
    pub query: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "file_id is required"))]
    pub file_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LibraryAnswer {
    pub answer: String,
    pub source: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentAnswer {
    pub answer: String,
    pub file_id: String,
}

/// Answer from the reference library
pub async fn ask_existing(
    State(state): State<AppState>,
    form: std::result::Result<Form<AskForm>, FormRejection>,
) -> Result<Json<LibraryAnswer>> {
    let form = validated_form(form)?;
    let query = non_blank(&form.query, "query")?;
    let library = state.library()?;

    let best = state
        .aggregator
        .answer_best_source(query, library.collections(), state.config.retrieval.library_top_k)
        .await?;
    let answer = state.generator.answer_with_excerpts(query, &best.context).await?;

    tracing::info!(source = %best.source, chunks = best.chunk_count, "Answered from reference library");

    Ok(Json(LibraryAnswer {
        answer,
        source: best.source,
    }))
}

/// Answer from an uploaded PDF
pub async fn ask_upload(State(state): State<AppState>, multipart: Multipart) -> Result<Json<DocumentAnswer>> {
    let mut form = MultipartForm::read(multipart, state.config.server.max_upload_bytes).await?;
    let query = form.text("query")?.to_string();
    let file = form.take_file("file")?;

    let id = CollectionId::from_bytes(&file.bytes);
    let bytes: std::sync::Arc<[u8]> = file.bytes.to_vec().into();
    let processor = state.processor.clone();
    let label = id.as_str().to_string();

    let index = state
        .cache
        .resolve(&id, || async move {
            let processed = processor.process_bytes(bytes, &label).await?;
            Ok::<_, AppError>(processed.chunks)
        })
        .await?;

    let answer = answer_from_index(&state, &query, &index).await?;

    tracing::info!(file_id = %id, filename = %file.filename, "Answered from uploaded document");

    Ok(Json(DocumentAnswer {
        answer,
        file_id: id.to_string(),
    }))
}

/// Answer a follow-up question about an already uploaded PDF
pub async fn ask_context(
    State(state): State<AppState>,
    form: std::result::Result<Form<AskContextForm>, FormRejection>,
) -> Result<Json<DocumentAnswer>> {
    let form = validated_form(form)?;
    let query = non_blank(&form.query, "query")?;
    let id = CollectionId::from_hash(&form.file_id)?;

    let index = state
        .cache
        .resolve_existing(&id)
        .await?
        .ok_or_else(|| AppError::CollectionNotFound { id: id.to_string() })?;

    let answer = answer_from_index(&state, query, &index).await?;

    Ok(Json(DocumentAnswer {
        answer,
        file_id: id.to_string(),
    }))
}

async fn answer_from_index(state: &AppState, query: &str, index: &legalrag_search::VectorIndex) -> Result<String> {
    let hits = state
        .aggregator
        .retrieve(query, index, state.config.retrieval.document_top_k)
        .await?;
    if hits.is_empty() {
        return Err(AppError::NoMatchFound);
    }
    state.generator.answer_from_document(query, &join_context(&hits)).await
}
