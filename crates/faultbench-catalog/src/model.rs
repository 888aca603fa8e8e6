//! Catalog data model
//!
//! Defines the fundamental catalog types:
//! - The versioned catalog itself
//! - Failure modes and their categories

use crate::duration::{parse_duration, DEFAULT_TIMEOUT};
use crate::eval_spec::EvalSpec;
use crate::inject::InjectSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Versioned, ordered collection of failure modes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    /// Catalog format version (required, non-empty)
    #[serde(default)]
    pub version: String,
    /// Failure modes in declaration order
    #[serde(default)]
    pub failures: Vec<Failure>,
}

impl Catalog {
    /// Find a failure mode by exact id
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Failure> {
        self.failures.iter().find(|f| f.id == id)
    }

    /// Number of failure modes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Whether the catalog has no failure modes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resource domain a failure mode belongs to
///
/// Routes the failure to an agent. Unrecognised names are kept verbatim so
/// the runner can report them as unroutable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Database failure modes
    Database,
    /// Cluster-orchestration failure modes
    Kubernetes,
    /// Failures spanning both domains
    Compound,
    /// Anything else
    Other(String),
}

impl Category {
    /// Category name as written in the catalog
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Database => "database",
            Self::Kubernetes => "kubernetes",
            Self::Compound => "compound",
            Self::Other(name) => name,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

/// Names are matched case-insensitively and stored lowercase
impl From<String> for Category {
    fn from(value: String) -> Self {
        let name = value.trim().to_lowercase();
        match name.as_str() {
            "database" => Self::Database,
            "kubernetes" => Self::Kubernetes,
            "compound" => Self::Compound,
            _ => Self::Other(name),
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A single failure mode: the unit of test
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Failure {
    /// Unique id, used as cross-reference key
    #[serde(default)]
    pub id: String,
    /// Human label
    #[serde(default)]
    pub name: String,
    /// Resource domain
    #[serde(default)]
    pub category: Category,
    /// Informational severity
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub description: String,
    /// How to produce the failure
    #[serde(default)]
    pub inject: InjectSpec,
    /// How to reverse it
    #[serde(default)]
    pub teardown: InjectSpec,
    /// Prompt template sent to the agent
    #[serde(default)]
    pub prompt: String,
    /// Expected evidence in the agent's answer
    #[serde(default)]
    pub evaluation: EvalSpec,
    /// Agent call timeout, e.g. `90s` or `2m`
    #[serde(default)]
    pub timeout: String,
}

impl Failure {
    /// Parsed agent timeout
    ///
    /// Empty or unparsable values fall back to [`DEFAULT_TIMEOUT`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        if self.timeout.trim().is_empty() {
            return DEFAULT_TIMEOUT;
        }
        parse_duration(&self.timeout).unwrap_or(DEFAULT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_known_and_unknown_names() {
        assert_eq!(Category::from("database"), Category::Database);
        assert_eq!(Category::from("kubernetes"), Category::Kubernetes);
        assert_eq!(Category::from("compound"), Category::Compound);

        let other = Category::from("network");
        assert_eq!(other, Category::Other("network".to_string()));
        assert_eq!(String::from(other), "network");
        assert_eq!(Category::Compound.to_string(), "compound");
    }

    #[test]
    fn category_names_ignore_case() {
        assert_eq!(Category::from("Database"), Category::Database);
        assert_eq!(Category::from(" KUBERNETES "), Category::Kubernetes);
        assert_eq!(Category::from("Network"), Category::Other("network".to_string()));

        let failure: Failure = serde_yaml::from_str("id: a\ncategory: Compound\n").unwrap();
        assert_eq!(failure.category, Category::Compound);
    }

    #[test]
    fn failure_timeout_defaults() {
        let mut failure = Failure::default();
        assert_eq!(failure.timeout(), Duration::from_secs(60));

        failure.timeout = "not-a-duration".to_string();
        assert_eq!(failure.timeout(), Duration::from_secs(60));

        failure.timeout = "90s".to_string();
        assert_eq!(failure.timeout(), Duration::from_secs(90));

        failure.timeout = "2m".to_string();
        assert_eq!(failure.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn catalog_find_by_id() {
        let catalog = Catalog {
            version: "1".to_string(),
            failures: vec![
                Failure {
                    id: "a".to_string(),
                    ..Failure::default()
                },
                Failure {
                    id: "b".to_string(),
                    ..Failure::default()
                },
            ],
        };
        assert_eq!(catalog.find("b").map(|f| f.id.as_str()), Some("b"));
        assert!(catalog.find("c").is_none());
        assert_eq!(catalog.len(), 2);
    }
}
