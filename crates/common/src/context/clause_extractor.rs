//! Clause extraction, summary, comparison and risk bucketing

use super::clause_parser::{clean_model_text, parse_clauses, ParseMode};
use super::generator::AnswerGenerator;
use super::prompts::Prompt;
use crate::errors::{AppError, Result};
use crate::models::{ClauseRecord, PageText, RiskLevel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// Clauses extracted from one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClauseExtraction {
    pub clauses: Vec<ClauseRecord>,
    pub summary: String,
    pub total_clauses: usize,
    pub parse_mode: ParseMode,
}

impl ClauseExtraction {
    fn from_clauses(clauses: Vec<ClauseRecord>, parse_mode: ParseMode) -> Self {
        Self {
            summary: summarize_clauses(&clauses),
            total_clauses: clauses.len(),
            clauses,
            parse_mode,
        }
    }
}

/// Model-written comparison of two clause lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClauseComparison {
    pub comparison_analysis: String,
    pub doc1_clause_count: usize,
    pub doc2_clause_count: usize,
}

/// Short view of a clause inside a risk bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseDigest {
    #[serde(rename = "type")]
    pub clause_type: String,
    pub text: String,
    pub analysis: String,
}

/// Clauses grouped by risk, with follow-up advice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskReport {
    pub high_risk: Vec<ClauseDigest>,
    pub medium_risk: Vec<ClauseDigest>,
    pub low_risk: Vec<ClauseDigest>,
    pub recommendations: Vec<String>,
}

const DIGEST_TEXT_CHARS: usize = 200;

/// Drives clause extraction against the generative model
pub struct ClauseExtractor {
    generator: Arc<AnswerGenerator>,
}

impl ClauseExtractor {
    pub fn new(generator: Arc<AnswerGenerator>) -> Self {
        Self { generator }
    }

    /// Extract clauses from raw document text
    #[instrument(skip_all, fields(chars = document.len()))]
    pub async fn extract_from_text(&self, document: &str) -> Result<ClauseExtraction> {
        if document.trim().is_empty() {
            return Err(AppError::Validation {
                message: "No text provided.".to_string(),
                field: Some("document_text".to_string()),
            });
        }

        let response = self.generator.generate(Prompt::ClauseExtraction { document }).await?;
        let parsed = parse_clauses(&response);

        tracing::info!(
            clauses = parsed.clauses.len(),
            mode = parsed.mode.as_str(),
            "Extracted clauses"
        );
        Ok(ClauseExtraction::from_clauses(parsed.clauses, parsed.mode))
    }

    /// Extract clauses from every page of a document, joined with blank lines
    pub async fn extract_from_pages(&self, pages: &[PageText]) -> Result<ClauseExtraction> {
        let document = pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        if document.trim().is_empty() {
            return Err(AppError::PdfParse {
                message: "document contains no extractable text".to_string(),
            });
        }
        self.extract_from_text(&document).await
    }

    /// Ask the model to compare two clause lists
    #[instrument(skip_all, fields(first = first.len(), second = second.len()))]
    pub async fn compare(&self, first: &[ClauseRecord], second: &[ClauseRecord]) -> Result<ClauseComparison> {
        let response = self.generator.generate(Prompt::ClauseComparison { first, second }).await?;

        Ok(ClauseComparison {
            comparison_analysis: clean_model_text(&response),
            doc1_clause_count: first.len(),
            doc2_clause_count: second.len(),
        })
    }
}

/// Deterministic overview of an extraction
pub fn summarize_clauses(clauses: &[ClauseRecord]) -> String {
    if clauses.is_empty() {
        return "No clauses were extracted from the document.".to_string();
    }

    let mut types: Vec<&str> = Vec::new();
    for clause in clauses {
        if !types.contains(&clause.clause_type.as_str()) {
            types.push(&clause.clause_type);
        }
    }
    let high_risk = clauses.iter().filter(|c| c.risk_level == RiskLevel::High).count();

    format!(
        "Clause Extraction Summary:\n\
        - Total clauses extracted: {}\n\
        - Clause types found: {}\n\
        - High-risk clauses: {}\n\
        - Document coverage: Comprehensive analysis completed",
        clauses.len(),
        types.join(", "),
        high_risk
    )
}

/// Group clauses by risk level. Unrated clauses count as low risk.
pub fn analyze_risks(clauses: &[ClauseRecord]) -> Result<RiskReport> {
    if clauses.is_empty() {
        return Err(AppError::Validation {
            message: "No clauses to analyze".to_string(),
            field: Some("clauses".to_string()),
        });
    }

    let mut report = RiskReport::default();
    for clause in clauses {
        let digest = ClauseDigest {
            clause_type: clause.clause_type.clone(),
            text: truncate_chars(&clause.text, DIGEST_TEXT_CHARS),
            analysis: clause.analysis.clone(),
        };
        match clause.risk_level {
            RiskLevel::High => report.high_risk.push(digest),
            RiskLevel::Medium => report.medium_risk.push(digest),
            RiskLevel::Low | RiskLevel::Unspecified => report.low_risk.push(digest),
        }
    }

    if !report.high_risk.is_empty() {
        report.recommendations.push("Review high-risk clauses with legal counsel".to_string());
    }
    if report.high_risk.len() > 3 {
        report
            .recommendations
            .push("Consider renegotiating terms to reduce risk exposure".to_string());
    }
    Ok(report)
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
