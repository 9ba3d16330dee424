//! Clause Response Parser
//!
//! Turns semi-structured model output into [`ClauseRecord`]s. Two stages:
//!
//! 1. **Strict**: every `CLAUSE_START ... CLAUSE_END` block becomes one record.
//! 2. **Fallback**: only when no delimited block exists. The text is split on
//!    blank lines and scanned for field labels; a `Type:` label starts a new
//!    record.
//!
//! Parsing never fails. Output with none of the expected labels yields an
//! empty list.

use crate::metrics;
use crate::models::{ClauseRecord, RiskLevel};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Which stage produced the records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    Strict,
    Fallback,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Strict => "strict",
            ParseMode::Fallback => "fallback",
        }
    }
}

/// Result of parsing one model response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedClauses {
    pub clauses: Vec<ClauseRecord>,
    pub mode: ParseMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Type,
    Text,
    KeyPoints,
    RiskLevel,
    Analysis,
}

impl Field {
    fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
            "type" | "clause type" => Some(Field::Type),
            "text" | "clause text" => Some(Field::Text),
            "key points" => Some(Field::KeyPoints),
            "risk level" => Some(Field::RiskLevel),
            "analysis" => Some(Field::Analysis),
            _ => None,
        }
    }

    /// Type and risk level are one-line values
    fn single_line(&self) -> bool {
        matches!(self, Field::Type | Field::RiskLevel)
    }
}

struct Patterns {
    emphasis_runs: Regex,
    bullets: Regex,
    single_emphasis: Regex,
    blank_runs: Regex,
    block: Regex,
    label: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |p: &str| Regex::new(p).expect("clause parser pattern is valid");
        Patterns {
            emphasis_runs: compile(r"\*{2,}"),
            bullets: compile(r"(?m)^[ \t]*[*\-•][ \t]*"),
            single_emphasis: compile(r"\*([^*]+)\*"),
            blank_runs: compile(r"\n{3,}"),
            block: compile(r"(?is)CLAUSE_START(.*?)CLAUSE_END"),
            label: compile(r"(?i)^[ \t]*(?:(?:\d+|[a-z])[.)][ \t]*)?(clause[ \t]+type|clause[ \t]+text|key[ \t]+points|risk[ \t]+level|analysis|type|text)[ \t]*:[ \t]*(.*)$"),
        }
    })
}

/// Strip markdown emphasis and leading bullet glyphs, collapse runs of
/// blank lines, trim.
pub fn clean_model_text(raw: &str) -> String {
    let p = patterns();
    let text = raw.replace("\r\n", "\n");
    let text = p.emphasis_runs.replace_all(&text, "");
    let text = p.bullets.replace_all(&text, "");
    let text = p.single_emphasis.replace_all(&text, "$1");
    let text = p.blank_runs.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Parse a model response into clause records
pub fn parse_clauses(raw: &str) -> ParsedClauses {
    let cleaned = clean_model_text(raw);
    let p = patterns();

    let blocks: Vec<&str> = p
        .block
        .captures_iter(&cleaned)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    let parsed = if blocks.is_empty() {
        let clauses = parse_fallback(&cleaned);
        tracing::warn!(
            clauses = clauses.len(),
            "No CLAUSE_START blocks in model output, used fallback parser"
        );
        ParsedClauses { clauses, mode: ParseMode::Fallback }
    } else {
        let clauses: Vec<ClauseRecord> = blocks
            .iter()
            .map(|block| {
                let mut builder = RecordBuilder::default();
                builder.feed_lines(block);
                builder.finish()
            })
            .filter(ClauseRecord::has_content)
            .collect();
        tracing::debug!(blocks = blocks.len(), clauses = clauses.len(), "Parsed delimited clauses");
        ParsedClauses { clauses, mode: ParseMode::Strict }
    };

    metrics::record_clause_parse(parsed.mode.as_str());
    parsed
}

fn parse_fallback(cleaned: &str) -> Vec<ClauseRecord> {
    let mut clauses = Vec::new();
    let mut builder = RecordBuilder::default();

    for section in cleaned.split("\n\n").map(str::trim).filter(|s| !s.is_empty()) {
        for line in section.lines() {
            match split_label(line) {
                Some((Field::Type, value)) => {
                    let done = std::mem::take(&mut builder).finish();
                    if done.has_content() {
                        clauses.push(done);
                    }
                    builder.start(Field::Type, value);
                }
                Some((field, value)) => builder.start(field, value),
                None => builder.continue_with(line),
            }
        }
        // A field never runs past its section
        builder.close();
    }

    let last = builder.finish();
    if last.has_content() {
        clauses.push(last);
    }
    clauses
}

fn split_label(line: &str) -> Option<(Field, &str)> {
    let caps = patterns().label.captures(line)?;
    let field = Field::from_label(caps.get(1)?.as_str())?;
    Some((field, caps.get(2).map_or("", |m| m.as_str())))
}

/// Accumulates labeled values for one record. The first value seen for a
/// field wins.
#[derive(Default)]
struct RecordBuilder<'a> {
    record: Option<ClauseRecord>,
    open: Option<(Field, Vec<&'a str>)>,
}

impl<'a> RecordBuilder<'a> {
    fn feed_lines(&mut self, block: &'a str) {
        for line in block.lines() {
            match split_label(line) {
                Some((field, value)) => self.start(field, value),
                None => self.continue_with(line),
            }
        }
    }

    fn start(&mut self, field: Field, first: &'a str) {
        self.close();
        self.open = Some((field, vec![first]));
    }

    fn continue_with(&mut self, line: &'a str) {
        if let Some((_, lines)) = self.open.as_mut() {
            lines.push(line);
        }
    }

    fn close(&mut self) {
        let Some((field, lines)) = self.open.take() else {
            return;
        };

        let value = if field.single_line() {
            lines.iter().map(|l| l.trim()).find(|l| !l.is_empty()).unwrap_or("").to_string()
        } else {
            lines.join("\n").trim().to_string()
        };
        if value.is_empty() {
            return;
        }

        let record = self.record.get_or_insert_with(ClauseRecord::default);
        let fresh = ClauseRecord::default();
        match field {
            Field::Type if record.clause_type == fresh.clause_type => record.clause_type = value,
            Field::Text if record.text == fresh.text => record.text = value,
            Field::KeyPoints if record.key_points == fresh.key_points => record.key_points = value,
            Field::RiskLevel if record.risk_level == RiskLevel::Unspecified => {
                record.risk_level = RiskLevel::parse(&value)
            }
            Field::Analysis if record.analysis == fresh.analysis => record.analysis = value,
            _ => {}
        }
    }

    fn finish(mut self) -> ClauseRecord {
        self.close();
        self.record.unwrap_or_default()
    }
}
