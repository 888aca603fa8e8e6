//! Functional tests for persisted run reports.
//!
//! These tests exercise the report file contract:
//! - A run's report lands at `<results_dir>/<run_id>.json` and reads back intact.
//! - Durations are stored as whole milliseconds under `duration_ms`.

use faultbench::{build_report, new_run_id, Harness, Report};
use faultbench_catalog::Failure;
use faultbench_test_utils::{
    sample_catalog, test_config, RecordingExecutor, Reply, ScriptedAgent, K8S_AGENT_URL,
};
use std::future::pending;
use std::sync::Arc;

/// Tenet: a written report reads back equal, including error results.
#[tokio::test(start_paused = true)]
async fn report_round_trips_through_results_dir() {
    let executor = Arc::new(RecordingExecutor::new());
    let agent = Arc::new(
        ScriptedAgent::answering("too many clients; connection exhaustion")
            .on(K8S_AGENT_URL, Reply::Status(500)),
    );
    let catalog = sample_catalog();
    let failures: Vec<&Failure> = catalog.failures.iter().collect();

    let outcome = Harness::new(test_config(), executor, agent)
        .run_all(&failures, pending())
        .await;
    let report = build_report(new_run_id(), outcome.results);
    assert_eq!(report.summary.total, 4);
    assert!(report.summary.categories.contains_key("kubernetes"));

    let dir = tempfile::tempdir().unwrap();
    let results_dir = dir.path().join("results");
    let path = report.write_json(&results_dir).unwrap();
    assert_eq!(path, results_dir.join(format!("{}.json", report.id)));

    let loaded = Report::read_json(&path).unwrap();
    assert_eq!(loaded, report);
}

/// Tenet: the JSON shape carries millisecond durations and omits absent errors.
#[tokio::test(start_paused = true)]
async fn json_uses_millisecond_durations() {
    let executor = Arc::new(RecordingExecutor::new());
    let agent = Arc::new(ScriptedAgent::answering("host unreachable"));
    let catalog = sample_catalog();
    let failure = catalog.find("wrong-dsn").unwrap();

    let outcome = Harness::new(test_config(), executor, agent)
        .run_all(&[failure], pending())
        .await;
    let report = build_report("run-fixed", outcome.results);

    let dir = tempfile::tempdir().unwrap();
    let path = report.write_json(dir.path()).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

    let result = &json["results"][0];
    assert_eq!(result["id"], "wrong-dsn");
    assert_eq!(result["duration_ms"], 0);
    assert!(result.get("error").is_none());
    assert_eq!(json["summary"]["pass_rate"], 1.0);
}

/// Tenet: reading a missing report is an error, not a panic.
#[test]
fn missing_report_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Report::read_json(&dir.path().join("run-none.json")).is_err());
}
