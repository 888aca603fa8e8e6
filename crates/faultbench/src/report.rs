//! Run reports
//!
//! Aggregates per-failure verdicts into summary statistics, renders them for
//! people and persists them as JSON for machines.

use crate::error::ReportError;
use crate::evaluator::EvalResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Totals for one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub total: usize,
    pub passed: usize,
    /// `passed / total`
    pub rate: f64,
}

/// Totals for a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// `passed / total`, 0 for an empty run
    pub pass_rate: f64,
    pub categories: BTreeMap<String, CategoryStats>,
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub results: Vec<EvalResult>,
    pub summary: Summary,
}

#[allow(clippy::cast_precision_loss)]
fn rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64
    }
}

/// Build a report from per-failure results
#[must_use]
pub fn build_report(run_id: impl Into<String>, results: Vec<EvalResult>) -> Report {
    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();

    let mut categories: BTreeMap<String, CategoryStats> = BTreeMap::new();
    for result in &results {
        let stats = categories.entry(result.category.clone()).or_default();
        stats.total += 1;
        if result.passed {
            stats.passed += 1;
        }
    }
    for stats in categories.values_mut() {
        stats.rate = rate(stats.passed, stats.total);
    }

    Report {
        id: run_id.into(),
        timestamp: Utc::now(),
        results,
        summary: Summary {
            total,
            passed,
            failed: total - passed,
            pass_rate: rate(passed, total),
            categories,
        },
    }
}

impl Report {
    /// Whether every failure passed
    #[inline]
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0
    }

    /// Where [`Report::write_json`] puts this report under `dir`
    #[must_use]
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.json", self.id))
    }

    /// Persist as `<dir>/<id>.json`, creating `dir` if needed
    ///
    /// # Errors
    /// Returns `ReportError` if the directory or file cannot be written.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(dir).map_err(|e| ReportError::io_error(dir, e))?;
        let path = self.path_in(dir);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| ReportError::io_error(&path, e))?;
        Ok(path)
    }

    /// Load a report written by [`Report::write_json`]
    ///
    /// # Errors
    /// Returns `ReportError` if the file cannot be read or decoded.
    pub fn read_json(path: &Path) -> Result<Self, ReportError> {
        let text = std::fs::read_to_string(path).map_err(|e| ReportError::io_error(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Human-readable rendering
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Run {} ({})", self.id, self.timestamp.to_rfc3339());
        let _ = writeln!(out);

        for r in &self.results {
            let pct = r.score * 100.0;
            if let Some(error) = &r.error {
                let _ = writeln!(out, "  ERROR {:<32} {error}", r.id);
            } else if r.passed {
                let _ = writeln!(out, "  PASS  {:<32} {pct:>5.1}%", r.id);
            } else {
                let _ = writeln!(
                    out,
                    "  FAIL  {:<32} {pct:>5.1}%  failed: {}",
                    r.id,
                    r.failed_checks().join(", ")
                );
            }
        }

        let s = &self.summary;
        let _ = writeln!(out);
        let _ = writeln!(out, "Summary");
        let _ = writeln!(out, "=======");
        let _ = writeln!(
            out,
            "  Total: {}  Passed: {}  Failed: {}  Pass rate: {:.1}%",
            s.total,
            s.passed,
            s.failed,
            s.pass_rate * 100.0
        );
        for (category, stats) in &s.categories {
            let _ = writeln!(
                out,
                "  {category:<12} {}/{} ({:.1}%)",
                stats.passed,
                stats.total,
                stats.rate * 100.0
            );
        }
        out
    }
}
