//! Harness configuration
//!
//! [`HarnessConfig`] holds everything injections and agent calls need to
//! know about the environment. It is never mutated during a run: a
//! `config`-type injection yields a [`ConfigOverride`] and the harness derives
//! an effective configuration from it for that one failure.

use faultbench_catalog::{Category, SqlTarget};
use std::path::PathBuf;
use std::time::Duration;

/// Agent endpoints, one per category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentEndpoints {
    /// Database diagnostic agent
    pub db: Option<String>,
    /// Cluster-orchestration diagnostic agent
    pub k8s: Option<String>,
    /// Orchestrator used for compound failures
    pub orchestrator: Option<String>,
}

impl AgentEndpoints {
    /// URL of the agent responsible for `category`
    ///
    /// Compound failures go to the orchestrator when one is configured and
    /// to the database agent otherwise.
    #[must_use]
    pub fn for_category(&self, category: &Category) -> Option<&str> {
        match category {
            Category::Database => self.db.as_deref(),
            Category::Kubernetes => self.k8s.as_deref(),
            Category::Compound => self.orchestrator.as_deref().or(self.db.as_deref()),
            Category::Other(_) => None,
        }
    }
}

/// External binaries the injector drives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub psql: String,
    pub docker: String,
    pub kubectl: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            psql: "psql".to_string(),
            docker: "docker".to_string(),
            kubectl: "kubectl".to_string(),
        }
    }
}

/// Run-time configuration shared by the injector and the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Primary database connection string
    pub conn_str: String,
    /// Replica database connection string
    pub replica_conn_str: String,
    /// Agent endpoints
    pub agents: AgentEndpoints,
    /// Cluster context passed to kubectl
    pub kube_context: String,
    /// Category filter
    pub categories: Vec<Category>,
    /// Explicit id filter
    pub ids: Vec<String>,
    /// Root for SQL and shell scripts
    pub scripts_root: PathBuf,
    /// Root for kustomize overlays
    pub overlays_root: PathBuf,
    /// Compose file for `docker` injections, plain `docker` when unset
    pub compose_file: Option<PathBuf>,
    /// Container used by `docker_exec` when the injection names none
    pub default_container: String,
    /// Wait after a detached exec so the background process can start
    pub detach_grace: Duration,
    /// Where reports are written
    pub results_dir: PathBuf,
    pub tools: ToolPaths,
}

impl HarnessConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With primary connection string
    #[inline]
    #[must_use]
    pub fn with_conn_str(mut self, conn_str: impl Into<String>) -> Self {
        self.conn_str = conn_str.into();
        self
    }

    /// With replica connection string
    #[inline]
    #[must_use]
    pub fn with_replica_conn_str(mut self, conn_str: impl Into<String>) -> Self {
        self.replica_conn_str = conn_str.into();
        self
    }

    /// With agent endpoints
    #[inline]
    #[must_use]
    pub fn with_agents(mut self, agents: AgentEndpoints) -> Self {
        self.agents = agents;
        self
    }

    /// With cluster context
    #[inline]
    #[must_use]
    pub fn with_kube_context(mut self, context: impl Into<String>) -> Self {
        self.kube_context = context.into();
        self
    }

    /// With selection filters
    #[inline]
    #[must_use]
    pub fn with_filters(mut self, categories: Vec<Category>, ids: Vec<String>) -> Self {
        self.categories = categories;
        self.ids = ids;
        self
    }

    /// With script and overlay roots
    #[inline]
    #[must_use]
    pub fn with_roots(mut self, scripts: impl Into<PathBuf>, overlays: impl Into<PathBuf>) -> Self {
        self.scripts_root = scripts.into();
        self.overlays_root = overlays.into();
        self
    }

    /// With detach grace period
    #[inline]
    #[must_use]
    pub fn with_detach_grace(mut self, grace: Duration) -> Self {
        self.detach_grace = grace;
        self
    }

    /// Connection string for a SQL target
    #[must_use]
    pub fn connection_for(&self, target: SqlTarget) -> &str {
        match target {
            SqlTarget::Primary => &self.conn_str,
            SqlTarget::Replica => &self.replica_conn_str,
        }
    }

    /// Configuration as seen after an injection's override
    #[must_use]
    pub fn effective(&self, overrides: Option<&ConfigOverride>) -> Self {
        let mut config = self.clone();
        if let Some(o) = overrides {
            if let Some(conn_str) = &o.conn_str {
                config.conn_str.clone_from(conn_str);
            }
        }
        config
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            conn_str: String::new(),
            replica_conn_str: String::new(),
            agents: AgentEndpoints::default(),
            kube_context: String::new(),
            categories: Vec::new(),
            ids: Vec::new(),
            scripts_root: PathBuf::from("scripts"),
            overlays_root: PathBuf::from("overlays"),
            compose_file: None,
            default_container: "postgres".to_string(),
            detach_grace: Duration::from_secs(2),
            results_dir: PathBuf::from("results"),
            tools: ToolPaths::default(),
        }
    }
}

/// Configuration change produced by a `config`-type injection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverride {
    /// Replacement primary connection string
    pub conn_str: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> AgentEndpoints {
        AgentEndpoints {
            db: Some("http://db-agent".to_string()),
            k8s: Some("http://k8s-agent".to_string()),
            orchestrator: None,
        }
    }

    #[test]
    fn compound_falls_back_to_db_agent() {
        let agents = endpoints();
        assert_eq!(agents.for_category(&Category::Compound), Some("http://db-agent"));

        let agents = AgentEndpoints {
            orchestrator: Some("http://orch".to_string()),
            ..endpoints()
        };
        assert_eq!(agents.for_category(&Category::Compound), Some("http://orch"));
    }

    #[test]
    fn unknown_category_has_no_agent() {
        let agents = endpoints();
        assert_eq!(agents.for_category(&Category::from("network")), None);
        assert_eq!(agents.for_category(&Category::Kubernetes), Some("http://k8s-agent"));
    }

    #[test]
    fn effective_config_leaves_base_untouched() {
        let base = HarnessConfig::new().with_conn_str("postgres://primary/app");
        let o = ConfigOverride {
            conn_str: Some("postgres://bogus/app".to_string()),
        };

        let effective = base.effective(Some(&o));
        assert_eq!(effective.conn_str, "postgres://bogus/app");
        assert_eq!(base.conn_str, "postgres://primary/app");
        assert_eq!(base.effective(None), base);
    }

    #[test]
    fn connection_for_target() {
        let config = HarnessConfig::new()
            .with_conn_str("primary")
            .with_replica_conn_str("replica");
        assert_eq!(config.connection_for(SqlTarget::Primary), "primary");
        assert_eq!(config.connection_for(SqlTarget::Replica), "replica");
    }
}
