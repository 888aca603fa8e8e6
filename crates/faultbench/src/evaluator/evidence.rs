//! Tool evidence patterns
//!
//! A diagnostic agent rarely names the tools it called. Instead each tool is
//! recognised by words its output tends to leave in the narrative, e.g. a
//! connectivity check shows up as "refused" or "reachable".

use std::collections::BTreeMap;

/// Tool name to evidence substrings
///
/// Patterns are stored lowercase; lookups expect lowercase text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceTable {
    patterns: BTreeMap<String, Vec<String>>,
}

impl EvidenceTable {
    /// Empty table; no tool is ever evidenced
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in patterns for the database and cluster agents' tools
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (tool, patterns) in BUILTIN {
            table = table.with_tool(*tool, patterns.iter().copied());
        }
        table
    }

    /// Add or replace a tool's patterns
    #[must_use]
    pub fn with_tool<I, S>(mut self, tool: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        self.patterns.insert(tool.into(), patterns);
        self
    }

    /// Patterns for a tool, empty if unknown
    #[must_use]
    pub fn patterns(&self, tool: &str) -> &[String] {
        self.patterns.get(tool).map_or(&[][..], Vec::as_slice)
    }

    /// Whether any of the tool's patterns occurs in `text_lower`
    #[must_use]
    pub fn is_evidenced(&self, tool: &str, text_lower: &str) -> bool {
        self.patterns(tool).iter().any(|p| text_lower.contains(p.as_str()))
    }

    /// Earliest offset at which any of the tool's patterns occurs
    #[must_use]
    pub fn first_offset(&self, tool: &str, text_lower: &str) -> Option<usize> {
        self.patterns(tool)
            .iter()
            .filter_map(|p| text_lower.find(p.as_str()))
            .min()
    }
}

const BUILTIN: &[(&str, &[&str])] = &[
    // database agent
    ("check_connection", &["connection", "refused", "reachable", "unreachable"]),
    (
        "get_active_connections",
        &[
            "active connections",
            "max_connections",
            "too many clients",
            "idle in transaction",
        ],
    ),
    ("get_slow_queries", &["slow query", "slow queries", "mean_exec_time", "pg_stat_statements"]),
    ("get_locks", &["lock", "blocked", "blocking", "deadlock"]),
    ("get_replication_status", &["replication", "replica", "lag", "wal"]),
    ("get_table_stats", &["dead tuples", "bloat", "vacuum", "seq_scan"]),
    ("explain_query", &["seq scan", "index scan", "query plan", "explain"]),
    ("get_database_config", &["shared_buffers", "work_mem", "setting", "parameter"]),
    // cluster agent
    ("list_pods", &["pod", "crashloopbackoff", "pending", "running"]),
    ("describe_pod", &["oomkilled", "exit code", "restart count", "container state"]),
    ("get_pod_logs", &["log", "stack trace", "panic", "exception"]),
    ("get_events", &["event", "backoff", "failedscheduling", "unhealthy"]),
    ("list_deployments", &["deployment", "replicas", "rollout", "unavailable"]),
    ("get_node_status", &["node", "notready", "memorypressure", "diskpressure"]),
    ("get_resource_usage", &["cpu", "memory", "limit", "throttl"]),
    ("get_services", &["service", "endpoint", "selector", "clusterip"]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_covers_both_agents() {
        let table = EvidenceTable::builtin();
        assert!(table.is_evidenced("check_connection", "connection refused on 5432"));
        assert!(table.is_evidenced("describe_pod", "last state: oomkilled"));
        assert!(!table.is_evidenced("get_locks", "all healthy"));
        assert!(table.patterns("no_such_tool").is_empty());
    }

    #[test]
    fn first_offset_picks_earliest_pattern() {
        let table = EvidenceTable::empty().with_tool("t", ["beta", "alpha"]);
        assert_eq!(table.first_offset("t", "xx alpha yy beta"), Some(3));
        assert_eq!(table.first_offset("t", "nothing"), None);
        assert_eq!(table.first_offset("missing", "alpha"), None);
    }

    #[test]
    fn patterns_are_lowercased() {
        let table = EvidenceTable::empty().with_tool("t", ["OOMKilled"]);
        assert!(table.is_evidenced("t", "container was oomkilled"));
    }
}
