//! Injection specifications
//!
//! Catalog files describe injections as a flat mapping keyed by `type`.
//! [`InjectSpec`] turns that mapping into one variant per mechanism so each
//! variant only carries the fields it uses.

use serde::Deserialize;
use std::path::PathBuf;

/// Which database connection a SQL injection runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlTarget {
    #[default]
    Primary,
    Replica,
}

/// Where the SQL of an injection comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlSource {
    /// SQL executed verbatim
    Inline(String),
    /// Script file, relative to the scripts root
    File(PathBuf),
}

/// One side effect and how to produce it
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "RawInjectSpec")]
pub enum InjectSpec {
    /// Run SQL against a database connection
    Sql {
        target: SqlTarget,
        source: SqlSource,
        /// Helper container whose client session should own the script
        via: Option<String>,
    },
    /// Start or stop a named service
    Docker { action: String, service: String },
    /// Copy a script into a running container and execute it
    DockerExec {
        script: PathBuf,
        container: Option<String>,
        detach: bool,
    },
    /// Apply a declarative overlay
    Kustomize { overlay: PathBuf },
    /// Delete an overlay, optionally re-applying a baseline afterwards
    KustomizeDelete {
        overlay: PathBuf,
        restore: Option<PathBuf>,
    },
    /// Override in-process configuration for the rest of the failure's life cycle
    Config { connection_string: Option<String> },
    /// Nothing to do
    #[default]
    Noop,
    /// Unrecognised `type`; rejected when dispatched
    Unknown { kind: String },
}

impl InjectSpec {
    /// The `type` name this spec was declared with
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Sql { .. } => "sql",
            Self::Docker { .. } => "docker",
            Self::DockerExec { .. } => "docker_exec",
            Self::Kustomize { .. } => "kustomize",
            Self::KustomizeDelete { .. } => "kustomize_delete",
            Self::Config { .. } => "config",
            Self::Noop => "",
            Self::Unknown { kind } => kind,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Noop)
    }
}

/// Catalog wire shape of an injection
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawInjectSpec {
    #[serde(rename = "type")]
    kind: String,
    sql: String,
    file: String,
    target: String,
    via: String,
    action: String,
    service: String,
    script: String,
    container: String,
    detach: bool,
    path: String,
    restore: String,
    connection_string: String,
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl From<RawInjectSpec> for InjectSpec {
    fn from(raw: RawInjectSpec) -> Self {
        match raw.kind.as_str() {
            "" => Self::Noop,
            "sql" => Self::Sql {
                target: if raw.target.eq_ignore_ascii_case("replica") {
                    SqlTarget::Replica
                } else {
                    SqlTarget::Primary
                },
                source: if raw.sql.is_empty() {
                    SqlSource::File(PathBuf::from(raw.file))
                } else {
                    SqlSource::Inline(raw.sql)
                },
                via: non_empty(raw.via),
            },
            "docker" => Self::Docker {
                action: raw.action,
                service: raw.service,
            },
            "docker_exec" => Self::DockerExec {
                script: PathBuf::from(raw.script),
                container: non_empty(raw.container),
                detach: raw.detach,
            },
            "kustomize" => Self::Kustomize {
                overlay: PathBuf::from(raw.path),
            },
            "kustomize_delete" => Self::KustomizeDelete {
                overlay: PathBuf::from(raw.path),
                restore: non_empty(raw.restore).map(PathBuf::from),
            },
            "config" => Self::Config {
                connection_string: non_empty(raw.connection_string),
            },
            _ => Self::Unknown { kind: raw.kind },
        }
    }
}
