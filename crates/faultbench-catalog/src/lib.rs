//! faultbench failure-mode catalog
//!
//! Typed, in-memory representation of the failure modes a diagnostic agent is
//! tested against, plus the loader and selection rules.
//!
//! # Core Concepts
//!
//! - [`Catalog`]: Versioned, ordered collection of failure modes
//! - [`Failure`]: One failure mode (inject, teardown, prompt, evaluation)
//! - [`InjectSpec`]: One variant per injection mechanism
//! - [`EvalSpec`]: Expected evidence a correct diagnosis must contain
//!
//! # Example
//!
//! ```rust,ignore
//! use faultbench_catalog::{filter_failures, load_catalog, Category};
//!
//! let catalog = load_catalog("failures.yaml")?;
//! let selected = filter_failures(&catalog, &[Category::Database], &[]);
//! println!("{} failures selected", selected.len());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod duration;
mod error;
mod eval_spec;
mod inject;
mod loader;
mod model;

// Re-exports
pub use duration::{parse_duration, DurationError, DEFAULT_TIMEOUT};
pub use error::CatalogError;
pub use eval_spec::{DiagnosisSpec, EvalSpec, KeywordSpec};
pub use inject::{InjectSpec, SqlSource, SqlTarget};
pub use loader::{filter_failures, load_catalog, parse_catalog};
pub use model::{Catalog, Category, Failure};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
