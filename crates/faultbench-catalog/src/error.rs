//! Error types for catalog loading

use std::path::PathBuf;

/// Errors raised while loading a failure catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Catalog file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog content is not well-formed
    #[error("malformed catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Catalog parsed but violates a required property
    #[error("invalid catalog: {0}")]
    Validation(String),

    /// Two failure modes share the same id
    #[error("duplicate failure id: '{0}'")]
    DuplicateId(String),
}

impl CatalogError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
