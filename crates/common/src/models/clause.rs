//! Structured clause records extracted from model output

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Sentinel for any field the model did not provide
pub const NOT_SPECIFIED: &str = "Not specified";

/// Risk rating attached to a clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    #[default]
    Unspecified,
}

impl RiskLevel {
    /// Interpret free text such as "High - uncapped liability"
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("high") {
            RiskLevel::High
        } else if lower.contains("medium") || lower.contains("moderate") {
            RiskLevel::Medium
        } else if lower.contains("low") {
            RiskLevel::Low
        } else {
            RiskLevel::Unspecified
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
            RiskLevel::Unspecified => NOT_SPECIFIED,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RiskLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(RiskLevel::parse(&raw))
    }
}

/// One clause extracted from a legal document.
///
/// Every text field holds [`NOT_SPECIFIED`] when the model omitted it, so
/// consumers never branch on missing keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseRecord {
    #[serde(rename = "type", default = "not_specified")]
    pub clause_type: String,
    #[serde(default = "not_specified")]
    pub text: String,
    #[serde(default = "not_specified")]
    pub key_points: String,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default = "not_specified")]
    pub analysis: String,
}

fn not_specified() -> String {
    NOT_SPECIFIED.to_string()
}

impl Default for ClauseRecord {
    fn default() -> Self {
        Self {
            clause_type: not_specified(),
            text: not_specified(),
            key_points: not_specified(),
            risk_level: RiskLevel::Unspecified,
            analysis: not_specified(),
        }
    }
}

impl ClauseRecord {
    /// True when at least one field carries a real value
    pub fn has_content(&self) -> bool {
        self.clause_type != NOT_SPECIFIED
            || self.text != NOT_SPECIFIED
            || self.key_points != NOT_SPECIFIED
            || self.risk_level != RiskLevel::Unspecified
            || self.analysis != NOT_SPECIFIED
    }

    /// True when none of the fields hold the sentinel
    pub fn is_complete(&self) -> bool {
        self.clause_type != NOT_SPECIFIED
            && self.text != NOT_SPECIFIED
            && self.key_points != NOT_SPECIFIED
            && self.risk_level != RiskLevel::Unspecified
            && self.analysis != NOT_SPECIFIED
    }
}
