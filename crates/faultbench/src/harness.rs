//! Per-failure life cycle
//!
//! For each selected failure, strictly one after another:
//!
//! 1. inject; on error record it and move on (nothing to tear down)
//! 2. ask the agent under the failure's timeout
//! 3. evaluate the answer
//! 4. tear down, even after an agent error or cancellation
//!
//! The shutdown future bounds every step, including injection and teardown
//! commands that never return.
//!
//! Failures never overlap: a stopped service affects every scenario that
//! uses it.

use crate::agent::AgentClient;
use crate::config::HarnessConfig;
use crate::error::{AgentError, HarnessError, InjectError, RunError};
use crate::evaluator::{EvalResult, Evaluator};
use crate::exec::CommandExecutor;
use crate::injector::Injector;
use crate::runner::Runner;
use faultbench_catalog::{filter_failures, Catalog, Category, Failure};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Time teardown may take once a run has been cancelled
pub const CANCELLED_TEARDOWN_GRACE: Duration = Duration::from_secs(30);

/// Results of a run over several failures
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// One result per failure that was started
    pub results: Vec<EvalResult>,
    /// Run stopped early on shutdown
    pub cancelled: bool,
}

/// Select the failures a configuration asks for
///
/// # Errors
/// - `HarnessError::NoMatchingFailures` if the selection is empty
/// - `HarnessError::MissingFlag` if database failures are selected without a
///   primary connection string
pub fn select_failures<'a>(
    catalog: &'a Catalog,
    config: &HarnessConfig,
) -> Result<Vec<&'a Failure>, HarnessError> {
    for id in &config.ids {
        if catalog.find(id).is_none() {
            tracing::warn!(id = %id, "requested failure id not in catalog");
        }
    }

    let selected = filter_failures(catalog, &config.categories, &config.ids);
    if selected.is_empty() {
        return Err(HarnessError::NoMatchingFailures);
    }

    let needs_db = selected
        .iter()
        .any(|f| matches!(f.category, Category::Database | Category::Compound));
    if needs_db && config.conn_str.is_empty() {
        return Err(HarnessError::MissingFlag("--conn-str"));
    }

    Ok(selected)
}

/// Drives inject → run → evaluate → teardown
#[derive(Debug, Clone)]
pub struct Harness {
    config: HarnessConfig,
    injector: Injector,
    runner: Runner,
    evaluator: Evaluator,
}

impl Harness {
    /// Create harness with the built-in evidence table
    #[must_use]
    pub fn new(
        config: HarnessConfig,
        executor: Arc<dyn CommandExecutor>,
        client: Arc<dyn AgentClient>,
    ) -> Self {
        Self {
            config,
            injector: Injector::new(executor),
            runner: Runner::new(client),
            evaluator: Evaluator::default(),
        }
    }

    /// Replace the evaluator
    #[inline]
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Run every failure in order until done or `shutdown` resolves
    ///
    /// A shutdown abandons the in-flight step, still tears that failure down,
    /// and skips the remaining failures.
    pub async fn run_all<F>(&self, failures: &[&Failure], shutdown: F) -> RunOutcome
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut outcome = RunOutcome::default();

        for (i, failure) in failures.iter().enumerate() {
            let stop = tokio::select! {
                biased;
                () = &mut shutdown => true,
                () = std::future::ready(()) => false,
            };
            if stop {
                tracing::warn!(remaining = failures.len() - i, "shutdown requested, stopping run");
                outcome.cancelled = true;
                break;
            }

            tracing::info!(
                failure = %failure.id,
                progress = %format!("{}/{}", i + 1, failures.len()),
                "starting failure"
            );
            let (result, cancelled) = self.run_failure(failure, shutdown.as_mut()).await;
            outcome.results.push(result);
            if cancelled {
                outcome.cancelled = true;
                break;
            }
        }

        outcome
    }

    /// Run one failure's full life cycle
    ///
    /// `shutdown` is watched during injection, the agent call and teardown.
    /// Once it fires, the current step is abandoned, teardown gets
    /// [`CANCELLED_TEARDOWN_GRACE`] and the returned flag is set.
    pub async fn run_failure<F>(
        &self,
        failure: &Failure,
        mut shutdown: Pin<&mut F>,
    ) -> (EvalResult, bool)
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        let mut cancelled = false;

        let injected = tokio::select! {
            r = self.injector.inject(&failure.inject, &self.config) => r,
            () = shutdown.as_mut() => {
                cancelled = true;
                Err(InjectError::Cancelled)
            }
        };
        let overrides = match injected {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(failure = %failure.id, error = %e, "injection failed");
                let result =
                    EvalResult::errored(failure, format!("inject: {e}"), started.elapsed());
                if cancelled {
                    // a half-applied injection is reversed as far as it goes
                    self.teardown(failure, &self.config, shutdown, true).await;
                }
                return (result, cancelled);
            }
        };
        let config = self.config.effective(overrides.as_ref());

        let response = tokio::select! {
            r = self.runner.run(failure, &config) => r,
            () = shutdown.as_mut() => {
                cancelled = true;
                Err(RunError {
                    source: AgentError::Cancelled,
                    elapsed: started.elapsed(),
                })
            }
        };

        let result = match response {
            Ok(response) => {
                let result = self
                    .evaluator
                    .evaluate(failure, &response.text)
                    .with_duration(response.elapsed);
                tracing::info!(
                    failure = %failure.id,
                    score = result.score,
                    passed = result.passed,
                    elapsed_ms = u64::try_from(response.elapsed.as_millis()).unwrap_or(u64::MAX),
                    "evaluated"
                );
                result
            }
            Err(e) => {
                tracing::error!(failure = %failure.id, error = %e.source, "agent call failed");
                EvalResult::errored(failure, format!("agent: {}", e.source), e.elapsed)
            }
        };

        let interrupted = self.teardown(failure, &config, shutdown, cancelled).await;
        (result, cancelled || interrupted)
    }

    /// Tear down, logging failures
    ///
    /// Bounded by the grace period when `cancelled` or once `shutdown` fires.
    /// Returns whether `shutdown` fired during the teardown.
    async fn teardown<F>(
        &self,
        failure: &Failure,
        config: &HarnessConfig,
        shutdown: Pin<&mut F>,
        cancelled: bool,
    ) -> bool
    where
        F: Future<Output = ()>,
    {
        let teardown = self.injector.teardown(&failure.teardown, config);
        tokio::pin!(teardown);

        let early = if cancelled {
            None
        } else {
            tokio::select! {
                r = &mut teardown => Some(r),
                () = shutdown => None,
            }
        };
        let interrupted = early.is_none() && !cancelled;

        let outcome = match early {
            Some(r) => r,
            None => {
                tracing::warn!(
                    failure = %failure.id,
                    grace_secs = CANCELLED_TEARDOWN_GRACE.as_secs(),
                    "run cancelled, bounding teardown"
                );
                tokio::time::timeout(CANCELLED_TEARDOWN_GRACE, teardown)
                    .await
                    .unwrap_or(Err(InjectError::Timeout(CANCELLED_TEARDOWN_GRACE)))
            }
        };

        if let Err(e) = outcome {
            tracing::warn!(failure = %failure.id, error = %e, "teardown failed");
        }
        interrupted
    }

    /// Inject a single failure and return the configuration it leaves behind
    ///
    /// # Errors
    /// Returns `InjectError` if the injection fails.
    pub async fn inject_only(&self, failure: &Failure) -> Result<HarnessConfig, InjectError> {
        let overrides = self.injector.inject(&failure.inject, &self.config).await?;
        Ok(self.config.effective(overrides.as_ref()))
    }

    /// Tear down a single failure
    ///
    /// # Errors
    /// Returns `InjectError` if the teardown fails.
    pub async fn teardown_only(&self, failure: &Failure) -> Result<(), InjectError> {
        self.injector.teardown(&failure.teardown, &self.config).await
    }
}
