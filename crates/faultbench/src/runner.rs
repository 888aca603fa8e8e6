//! Prompt resolution and agent invocation

use crate::agent::AgentClient;
use crate::config::HarnessConfig;
use crate::error::{AgentError, RunError};
use faultbench_catalog::{Category, Failure};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Replaced by the primary connection string
pub const CONN_STR_PLACEHOLDER: &str = "{{.ConnStr}}";
/// Replaced by the replica connection string
pub const REPLICA_CONN_STR_PLACEHOLDER: &str = "{{.ReplicaConnStr}}";
/// Replaced by the cluster context
pub const KUBE_CONTEXT_PLACEHOLDER: &str = "{{.KubeContext}}";

/// Agent answer for one failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentResponse {
    pub text: String,
    pub elapsed: Duration,
}

/// Fill a prompt template from configuration
///
/// A placeholder whose value is empty is left as written.
#[must_use]
pub fn resolve_prompt(template: &str, config: &HarnessConfig) -> String {
    let mut prompt = template.to_string();
    for (placeholder, value) in [
        (CONN_STR_PLACEHOLDER, &config.conn_str),
        (REPLICA_CONN_STR_PLACEHOLDER, &config.replica_conn_str),
        (KUBE_CONTEXT_PLACEHOLDER, &config.kube_context),
    ] {
        if !value.is_empty() {
            prompt = prompt.replace(placeholder, value);
        }
    }
    prompt
}

/// Agent URL for a category
///
/// # Errors
/// `AgentError::NoAgentForCategory` when no endpoint serves the category.
pub fn resolve_agent_url<'a>(
    category: &Category,
    config: &'a HarnessConfig,
) -> Result<&'a str, AgentError> {
    config
        .agents
        .for_category(category)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AgentError::NoAgentForCategory(category.to_string()))
}

/// Sends resolved prompts to the right agent
#[derive(Clone)]
pub struct Runner {
    client: Arc<dyn AgentClient>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner").finish_non_exhaustive()
    }
}

impl Runner {
    /// Create runner over an agent client
    #[inline]
    #[must_use]
    pub fn new(client: Arc<dyn AgentClient>) -> Self {
        Self { client }
    }

    /// Ask the failure's agent to diagnose it
    ///
    /// One request, bounded by the failure's timeout. No retries.
    ///
    /// # Errors
    /// Returns `RunError` carrying the elapsed time when no agent is
    /// configured, the call times out or the transport fails.
    pub async fn run(
        &self,
        failure: &Failure,
        config: &HarnessConfig,
    ) -> Result<AgentResponse, RunError> {
        let started = Instant::now();
        let fail = |source: AgentError| RunError {
            source,
            elapsed: started.elapsed(),
        };

        let url = resolve_agent_url(&failure.category, config).map_err(fail)?;
        let prompt = resolve_prompt(&failure.prompt, config);
        let timeout = failure.timeout();

        tracing::info!(
            failure = %failure.id,
            url,
            timeout_secs = timeout.as_secs(),
            "asking agent"
        );

        let call = self.client.send(url, &prompt, timeout);
        let text = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(fail(e)),
            Err(_) => return Err(fail(AgentError::Timeout(timeout))),
        };

        Ok(AgentResponse {
            text,
            elapsed: started.elapsed(),
        })
    }
}
