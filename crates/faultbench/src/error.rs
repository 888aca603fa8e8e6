//! Error types for faultbench
//!
//! Provides error handling for:
//! - Setup (catalog, flags, selection) which aborts a run
//! - External command execution
//! - Injection and teardown, recorded per failure
//! - Agent calls, recorded per failure
//! - Report persistence

use faultbench_catalog::CatalogError;
use std::path::PathBuf;
use std::time::Duration;

/// Fatal setup errors; nothing has been injected yet
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Catalog could not be loaded
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Selection produced nothing to run
    #[error("no failures match the given categories/ids")]
    NoMatchingFailures,

    /// A flag required by the selected failures was not provided
    #[error("missing required flag: {0}")]
    MissingFlag(&'static str),

    /// Failure id not present in the catalog
    #[error("unknown failure id: '{0}'")]
    UnknownFailure(String),

    /// Report could not be written or read
    #[error("report error: {0}")]
    Report(#[from] ReportError),
}

/// External command failed to run or exited non-zero
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Binary could not be started
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Command ran but reported failure
    #[error("{command} exited with {code}: {output}")]
    Failed {
        command: String,
        code: i32,
        /// Combined stdout and stderr
        output: String,
    },
}

/// Errors producing or reversing a side effect
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    /// Underlying command failed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Script file could not be read
    #[error("cannot read script {path}: {source}")]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Docker action other than start/stop
    #[error("invalid docker action '{0}' (expected start or stop)")]
    InvalidDockerAction(String),

    /// Injection type with no dispatcher
    #[error("unknown injection type: '{0}'")]
    UnknownInjectionType(String),

    /// Run was cancelled before the side effect completed
    #[error("cancelled before the step completed")]
    Cancelled,

    /// Step did not complete within its allowance
    #[error("gave up after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl InjectError {
    /// Create script read error for path
    pub fn script_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ScriptRead {
            path: path.into(),
            source,
        }
    }
}

/// Errors contacting the diagnostic agent
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// No agent URL configured for the failure's category
    #[error("no agent configured for category '{0}'")]
    NoAgentForCategory(String),

    /// Agent did not answer in time
    #[error("agent timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Request could not be delivered or the reply could not be read
    #[error("agent transport error: {0}")]
    Transport(String),

    /// Agent answered with a non-success status
    #[error("agent returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Run was cancelled while waiting on the agent
    #[error("cancelled while waiting for agent")]
    Cancelled,
}

impl AgentError {
    /// Configuration problem rather than a runtime failure
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NoAgentForCategory(_))
    }
}

/// Failed agent call, with the time spent before it failed
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct RunError {
    #[source]
    pub source: AgentError,
    pub elapsed: Duration,
}

impl From<reqwest::Error> for AgentError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

/// Errors persisting or loading a report
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("report encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
