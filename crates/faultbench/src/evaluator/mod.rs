//! Lexical scoring of agent responses
//!
//! Every check is a case-insensitive substring test over the whole response;
//! no language understanding is involved. Three weighted signals make up the
//! score and two of them, plus tool ordering, gate the verdict:
//!
//! | Signal        | Weight | Gate                    |
//! |---------------|--------|-------------------------|
//! | keywords      | 0.5    | `keyword_pass`          |
//! | diagnosis     | 0.3    | through the score only  |
//! | tool evidence | 0.2    | through the score only  |
//! | tool ordering | -      | `ordering_pass`         |
//!
//! `passed = score >= 0.6 && keyword_pass && ordering_pass`

mod evidence;

pub use evidence::EvidenceTable;

use faultbench_catalog::{EvalSpec, Failure};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const KEYWORD_WEIGHT: f64 = 0.5;
pub const DIAGNOSIS_WEIGHT: f64 = 0.3;
pub const TOOL_WEIGHT: f64 = 0.2;
/// Minimum score for a pass
pub const PASS_THRESHOLD: f64 = 0.6;

/// Verdict for one failure mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Weighted score in `[0, 1]`
    pub score: f64,
    pub keyword_pass: bool,
    pub diagnosis_pass: bool,
    pub tool_evidence: bool,
    pub ordering_pass: bool,
    pub passed: bool,
    /// Agent response as received
    #[serde(default)]
    pub response: String,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvalResult {
    /// Result for a failure whose injection or agent call failed
    #[must_use]
    pub fn errored(failure: &Failure, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: failure.id.clone(),
            name: failure.name.clone(),
            category: failure.category.to_string(),
            score: 0.0,
            keyword_pass: false,
            diagnosis_pass: false,
            tool_evidence: false,
            ordering_pass: false,
            passed: false,
            response: String::new(),
            duration,
            error: Some(error.into()),
        }
    }

    /// Attach the elapsed time of the agent call
    #[inline]
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Names of the sub-checks that did not hold
    #[must_use]
    pub fn failed_checks(&self) -> Vec<&'static str> {
        [
            (self.keyword_pass, "keywords"),
            (self.diagnosis_pass, "diagnosis"),
            (self.tool_evidence, "tool-evidence"),
            (self.ordering_pass, "ordering"),
        ]
        .into_iter()
        .filter(|(ok, _)| !ok)
        .map(|(_, name)| name)
        .collect()
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Value and verdict of one signal
#[derive(Debug, Clone, Copy, PartialEq)]
struct Signal {
    value: f64,
    pass: bool,
}

impl Signal {
    const VACUOUS: Self = Self {
        value: 1.0,
        pass: true,
    };
}

/// Scores agent responses against a failure's expected evidence
#[derive(Debug, Clone)]
pub struct Evaluator {
    evidence: EvidenceTable,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(EvidenceTable::builtin())
    }
}

impl Evaluator {
    /// Create evaluator over a tool evidence table
    #[inline]
    #[must_use]
    pub fn new(evidence: EvidenceTable) -> Self {
        Self { evidence }
    }

    /// Score `response` for `failure`
    ///
    /// Cannot fail; empty text simply scores low. The returned duration is
    /// zero, see [`EvalResult::with_duration`].
    #[must_use]
    pub fn evaluate(&self, failure: &Failure, response: &str) -> EvalResult {
        let text = response.to_lowercase();
        let spec = &failure.evaluation;

        let keyword = keyword_signal(spec, &text);
        let diagnosis = diagnosis_signal(spec, &text);
        let tools = self.tool_signal(spec, &text);
        let ordering_pass = self.ordering_holds(spec, &text);

        let score = keyword.value * KEYWORD_WEIGHT
            + diagnosis.value * DIAGNOSIS_WEIGHT
            + tools.value * TOOL_WEIGHT;
        let passed = score >= PASS_THRESHOLD && keyword.pass && ordering_pass;

        tracing::debug!(failure = %failure.id, score, passed, "evaluated response");

        EvalResult {
            id: failure.id.clone(),
            name: failure.name.clone(),
            category: failure.category.to_string(),
            score,
            keyword_pass: keyword.pass,
            diagnosis_pass: diagnosis.pass,
            tool_evidence: tools.pass,
            ordering_pass,
            passed,
            response: response.to_string(),
            duration: Duration::ZERO,
            error: None,
        }
    }

    fn tool_signal(&self, spec: &EvalSpec, text: &str) -> Signal {
        if spec.expected_tools.is_empty() {
            return Signal::VACUOUS;
        }
        let found = spec
            .expected_tools
            .iter()
            .filter(|tool| self.evidence.is_evidenced(tool, text))
            .count();
        let value = ratio(found, spec.expected_tools.len());
        Signal {
            value,
            pass: value > 0.5,
        }
    }

    fn ordering_holds(&self, spec: &EvalSpec, text: &str) -> bool {
        spec.expected_tool_order.iter().all(|(before, after)| {
            match (
                self.evidence.first_offset(before, text),
                self.evidence.first_offset(after, text),
            ) {
                (Some(a), Some(b)) => a < b,
                _ => false,
            }
        })
    }
}

fn keyword_signal(spec: &EvalSpec, text: &str) -> Signal {
    let keywords = &spec.expected_keywords.any_of;
    if keywords.is_empty() {
        return Signal::VACUOUS;
    }
    let pass = keywords
        .iter()
        .any(|k| text.contains(k.to_lowercase().as_str()));
    Signal {
        value: if pass { 1.0 } else { 0.0 },
        pass,
    }
}

fn diagnosis_signal(spec: &EvalSpec, text: &str) -> Signal {
    let words: Vec<String> = spec
        .expected_diagnosis
        .words()
        .map(str::to_lowercase)
        .collect();
    if words.is_empty() {
        return Signal::VACUOUS;
    }
    let present = words.iter().filter(|w| text.contains(w.as_str())).count();
    let value = ratio(present, words.len());
    let pass = value >= 0.5;
    Signal {
        value: if pass { value } else { 0.0 },
        pass,
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64
}
