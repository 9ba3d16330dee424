//! Clause extraction, comparison and risk handlers

use axum::{
    extract::{multipart::Multipart, rejection::FormRejection, rejection::JsonRejection, State},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::form::{validated_form, validated_json, MultipartForm, UploadedFile};
use crate::AppState;
use legalrag_common::{
    context::{analyze_risks, ClauseComparison, ClauseExtraction, RiskReport},
    errors::{AppError, Result},
    models::ClauseRecord,
};

#[derive(Debug, Deserialize, Validate)]
pub struct ClauseTextForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "No text provided."))]
    pub document_text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RiskRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "No clauses to analyze"))]
    pub clauses: Vec<ClauseRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentClauses {
    pub filename: String,
    pub clauses: Vec<ClauseRecord>,
    pub total_clauses: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComparisonResponse {
    pub document1: DocumentClauses,
    pub document2: DocumentClauses,
    pub comparison: ClauseComparison,
}

pub async fn extract_clauses(State(state): State<AppState>, multipart: Multipart) -> Result<Json<ClauseExtraction>> {
    let mut form = MultipartForm::read(multipart, state.config.server.max_upload_bytes).await?;
    let file = form.take_file("file")?;
    let extraction = extract_from_upload(&state, &file).await?;
    Ok(Json(extraction))
}

pub async fn extract_clauses_from_text(
    State(state): State<AppState>,
    form: std::result::Result<Form<ClauseTextForm>, FormRejection>,
) -> Result<Json<ClauseExtraction>> {
    let form = validated_form(form)?;
    let extraction = state.extractor.extract_from_text(&form.document_text).await?;
    Ok(Json(extraction))
}

/// Extract both documents concurrently, then have the model compare them
pub async fn compare_clauses(State(state): State<AppState>, multipart: Multipart) -> Result<Json<ComparisonResponse>> {
    let mut form = MultipartForm::read(multipart, state.config.server.max_upload_bytes).await?;
    let first = form.take_file("file1")?;
    let second = form.take_file("file2")?;

    let (first_extraction, second_extraction) =
        futures::try_join!(extract_from_upload(&state, &first), extract_from_upload(&state, &second))?;

    let comparison = state
        .extractor
        .compare(&first_extraction.clauses, &second_extraction.clauses)
        .await?;

    Ok(Json(ComparisonResponse {
        document1: DocumentClauses {
            filename: first.filename,
            total_clauses: first_extraction.total_clauses,
            clauses: first_extraction.clauses,
        },
        document2: DocumentClauses {
            filename: second.filename,
            total_clauses: second_extraction.total_clauses,
            clauses: second_extraction.clauses,
        },
        comparison,
    }))
}

pub async fn analyze_clause_risks(json: std::result::Result<Json<RiskRequest>, JsonRejection>) -> Result<Json<RiskReport>> {
    let request = validated_json(json)?;
    Ok(Json(analyze_risks(&request.clauses)?))
}

async fn extract_from_upload(state: &AppState, file: &UploadedFile) -> Result<ClauseExtraction> {
    let bytes: Arc<[u8]> = file.bytes.to_vec().into();
    let pages = state
        .processor
        .pages_from_bytes(bytes, &file.filename)
        .await
        .map_err(AppError::from)?;
    state.extractor.extract_from_pages(&pages).await
}
