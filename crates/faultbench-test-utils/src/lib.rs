//! Testing utilities for faultbench workspace
//!
//! Shared fixtures plus scripted stand-ins for the command executor and the
//! diagnostic agent, so harness life cycles run without infrastructure.

#![allow(missing_docs)]

use faultbench::error::{AgentError, CommandError};
use faultbench::exec::{CommandExecutor, CommandSpec};
use faultbench::{AgentClient, AgentEndpoints, HarnessConfig};
use faultbench_catalog::{parse_catalog, Catalog, Failure};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const DB_AGENT_URL: &str = "http://db-agent.test/chat";
pub const K8S_AGENT_URL: &str = "http://k8s-agent.test/chat";
pub const PRIMARY_CONN_STR: &str = "postgres://bench@primary:5432/app";

/// Four failures covering the injection kinds a life cycle cares about
pub const SAMPLE_CATALOG: &str = r#"
version: "test"
failures:
  - id: conn-exhaustion
    name: Connection pool exhausted
    category: database
    severity: high
    inject:
      type: sql
      sql: SELECT hold_connections()
    teardown:
      type: sql
      sql: SELECT release_connections()
    prompt: "Clients cannot connect to {{.ConnStr}}. Diagnose."
    evaluation:
      expected_tools: [check_connection, get_active_connections]
      expected_keywords:
        any_of: [max_connections, too many clients]
      expected_diagnosis:
        category: connection_exhaustion
      expected_tool_order:
        - [check_connection, get_active_connections]
  - id: wrong-dsn
    name: Agent pointed at a dead host
    category: database
    severity: medium
    inject:
      type: config
      connection_string: postgres://nobody@10.255.255.1:5432/app
    prompt: "Queries against {{.ConnStr}} hang. Diagnose."
    evaluation:
      expected_keywords:
        any_of: [unreachable, timed out]
  - id: db-stopped
    name: Database container stopped
    category: database
    severity: critical
    inject: { type: docker, action: stop, service: postgres }
    teardown: { type: docker, action: start, service: postgres }
    prompt: "Nothing responds on {{.ConnStr}}."
    evaluation:
      expected_keywords:
        any_of: [refused, down]
  - id: oom-pod
    name: Pod OOMKilled
    category: kubernetes
    severity: high
    inject: { type: kustomize, path: oom }
    teardown: { type: kustomize_delete, path: oom, restore: base }
    prompt: "The api pod in {{.KubeContext}} keeps restarting."
    evaluation:
      expected_tools: [describe_pod]
      expected_keywords:
        any_of: [oomkilled, memory limit]
      expected_diagnosis:
        category: out_of_memory
"#;

/// Parsed [`SAMPLE_CATALOG`]
pub fn sample_catalog() -> Catalog {
    parse_catalog(SAMPLE_CATALOG).unwrap()
}

/// One failure from [`SAMPLE_CATALOG`]
pub fn sample_failure(id: &str) -> Failure {
    sample_catalog().find(id).cloned().unwrap()
}

/// Configuration pointing at the test agent URLs
pub fn test_config() -> HarnessConfig {
    HarnessConfig::new()
        .with_conn_str(PRIMARY_CONN_STR)
        .with_kube_context("kind-test")
        .with_agents(AgentEndpoints {
            db: Some(DB_AGENT_URL.to_string()),
            k8s: Some(K8S_AGENT_URL.to_string()),
            orchestrator: None,
        })
        .with_detach_grace(Duration::ZERO)
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Executor that records command lines and fails or hangs on matching ones
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    commands: Mutex<Vec<String>>,
    fail_on: Vec<String>,
    hang_on: Vec<String>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any command whose line contains `pattern`
    #[must_use]
    pub fn failing_on(mut self, pattern: impl Into<String>) -> Self {
        self.fail_on.push(pattern.into());
        self
    }

    /// Never complete any command whose line contains `pattern`
    #[must_use]
    pub fn hanging_on(mut self, pattern: impl Into<String>) -> Self {
        self.hang_on.push(pattern.into());
        self
    }

    /// Command lines run so far, in order
    pub fn commands(&self) -> Vec<String> {
        lock(&self.commands).clone()
    }

    /// Number of recorded commands containing `pattern`
    pub fn count_matching(&self, pattern: &str) -> usize {
        lock(&self.commands)
            .iter()
            .filter(|c| c.contains(pattern))
            .count()
    }
}

#[async_trait::async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn run(&self, command: &CommandSpec) -> Result<String, CommandError> {
        let line = command.to_string();
        lock(&self.commands).push(line.clone());
        if self.hang_on.iter().any(|p| line.contains(p.as_str())) {
            std::future::pending::<()>().await;
        }
        if self.fail_on.iter().any(|p| line.contains(p.as_str())) {
            return Err(CommandError::Failed {
                command: line,
                code: 1,
                output: "scripted failure".to_string(),
            });
        }
        Ok(String::new())
    }
}

/// What a [`ScriptedAgent`] does with a prompt
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Status(u16),
    /// Never answers
    Hang,
}

/// Agent answering from a script keyed by URL
#[derive(Debug)]
pub struct ScriptedAgent {
    replies: Vec<(String, Reply)>,
    fallback: Reply,
    prompts: Mutex<Vec<(String, String)>>,
}

impl Default for ScriptedAgent {
    fn default() -> Self {
        Self {
            replies: Vec::new(),
            fallback: Reply::Text(String::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedAgent {
    /// Agent answering every prompt with `text`
    pub fn answering(text: impl Into<String>) -> Self {
        Self {
            fallback: Reply::Text(text.into()),
            ..Self::default()
        }
    }

    /// Reply for prompts sent to `url`
    #[must_use]
    pub fn on(mut self, url: impl Into<String>, reply: Reply) -> Self {
        self.replies.push((url.into(), reply));
        self
    }

    /// Reply for every other URL
    #[must_use]
    pub fn otherwise(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    /// `(url, prompt)` pairs received so far
    pub fn prompts(&self) -> Vec<(String, String)> {
        lock(&self.prompts).clone()
    }
}

#[async_trait::async_trait]
impl AgentClient for ScriptedAgent {
    async fn send(
        &self,
        url: &str,
        prompt: &str,
        _timeout: Duration,
    ) -> Result<String, AgentError> {
        lock(&self.prompts).push((url.to_string(), prompt.to_string()));
        let reply = self
            .replies
            .iter()
            .find(|(u, _)| u == url)
            .map_or(&self.fallback, |(_, r)| r)
            .clone();

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Status(status) => Err(AgentError::Status {
                status,
                body: "scripted".to_string(),
            }),
            Reply::Hang => std::future::pending().await,
        }
    }
}
