//! faultbench - fault injection and evaluation harness for diagnostic agents
//!
//! Drives a catalog of reproducible failures against live infrastructure:
//! - Injects each failure (SQL, container control, scripts, manifests)
//! - Asks the matching diagnostic agent what went wrong
//! - Scores the answer against the failure's expected evidence
//! - Tears the failure down and reports per-category pass rates
//!
//! # Example
//!
//! ```rust,ignore
//! use faultbench::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let catalog = load_catalog("failures.yaml")?;
//! let config = HarnessConfig::new().with_conn_str("postgres://localhost/app");
//! let selected = select_failures(&catalog, &config)?;
//!
//! let harness = Harness::new(
//!     config,
//!     Arc::new(ProcessExecutor),
//!     Arc::new(HttpAgentClient::new()),
//! );
//! let outcome = harness.run_all(&selected, std::future::pending()).await;
//! let report = build_report(new_run_id(), outcome.results);
//! println!("{}", report.generate_text());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod agent;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod exec;
pub mod harness;
pub mod injector;
pub mod logging;
pub mod report;
pub mod runner;

// Re-exports for convenience
pub use agent::{AgentClient, HttpAgentClient};
pub use config::{AgentEndpoints, ConfigOverride, HarnessConfig, ToolPaths};
pub use error::{
    AgentError, CommandError, HarnessError, InjectError, ReportError, RunError,
};
pub use evaluator::{EvalResult, Evaluator, EvidenceTable, PASS_THRESHOLD};
pub use exec::{CommandExecutor, CommandSpec, ProcessExecutor};
pub use harness::{select_failures, Harness, RunOutcome};
pub use injector::{Injector, Phase};
pub use report::{build_report, CategoryStats, Report, Summary};
pub use runner::{resolve_agent_url, resolve_prompt, AgentResponse, Runner};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a run
    pub use crate::{
        build_report, new_run_id, select_failures, AgentEndpoints, EvalResult, Evaluator,
        Harness, HarnessConfig, HttpAgentClient, ProcessExecutor, Report,
    };
    pub use faultbench_catalog::{load_catalog, Catalog, Category, Failure};
}

/// Fresh run identifier, `run-<ulid>`
#[must_use]
pub fn new_run_id() -> String {
    format!("run-{}", ulid::Ulid::new())
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
