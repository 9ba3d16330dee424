//! Generation layer
//!
//! - Prompt templates
//! - Answer generation over retrieved context
//! - Clause response parsing with strict and fallback modes
//! - Clause extraction, comparison and risk analysis

mod clause_extractor;
mod clause_parser;
mod generator;
mod prompts;

pub use clause_extractor::{
    analyze_risks, summarize_clauses, ClauseComparison, ClauseDigest, ClauseExtraction, ClauseExtractor, RiskReport,
};
pub use clause_parser::{clean_model_text, parse_clauses, ParseMode, ParsedClauses};
pub use generator::AnswerGenerator;
pub use prompts::{Prompt, PromptKind};
