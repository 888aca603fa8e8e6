//! Expected evidence for a failure mode

use serde::Deserialize;
use std::collections::BTreeSet;

/// What a correct agent response must contain
///
/// Every field is optional; an absent field is vacuously satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EvalSpec {
    /// Tools whose output should show up in the response
    pub expected_tools: BTreeSet<String>,
    pub expected_keywords: KeywordSpec,
    pub expected_diagnosis: DiagnosisSpec,
    /// `(earlier, later)` tool pairs, by first evidence in the response
    pub expected_tool_order: Vec<(String, String)>,
}

/// At least one keyword must appear
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeywordSpec {
    pub any_of: Vec<String>,
}

/// Diagnosis phrase, used as a bag of words
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiagnosisSpec {
    /// e.g. `connection_exhaustion`
    pub category: String,
}

impl DiagnosisSpec {
    /// Words of the diagnosis phrase, split on `_`, `-` and spaces
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.category
            .split(['_', '-', ' '])
            .filter(|w| !w.is_empty())
    }
}
