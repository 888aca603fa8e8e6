//! Catalog loading and failure selection

use crate::error::CatalogError;
use crate::model::{Catalog, Category, Failure};
use std::collections::HashSet;
use std::path::Path;

/// Read and validate a catalog file
///
/// # Errors
/// - `CatalogError::Io` if the file cannot be read
/// - `CatalogError::Parse` if the content is malformed
/// - `CatalogError::Validation` if `version` is missing or empty
/// - `CatalogError::DuplicateId` if two failures share an id
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog, CatalogError> {
    let path = path.as_ref();
    let text =
        std::fs::read_to_string(path).map_err(|e| CatalogError::io_error(path, e))?;
    parse_catalog(&text)
}

/// Parse and validate catalog text
///
/// # Errors
/// Same as [`load_catalog`], minus I/O.
pub fn parse_catalog(text: &str) -> Result<Catalog, CatalogError> {
    let catalog: Catalog = serde_yaml::from_str(text)?;

    if catalog.version.trim().is_empty() {
        return Err(CatalogError::Validation(
            "catalog version is missing or empty".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(catalog.failures.len());
    for failure in &catalog.failures {
        if !seen.insert(failure.id.as_str()) {
            return Err(CatalogError::DuplicateId(failure.id.clone()));
        }
    }

    Ok(catalog)
}

/// Select failures by category and/or id
///
/// With both filters empty every failure is returned. Otherwise the result is
/// the union of failures listed in `ids` and failures whose category is in
/// `categories`, in catalog order. An id match is kept even when its category
/// is not selected.
#[must_use]
pub fn filter_failures<'a>(
    catalog: &'a Catalog,
    categories: &[Category],
    ids: &[String],
) -> Vec<&'a Failure> {
    if categories.is_empty() && ids.is_empty() {
        return catalog.failures.iter().collect();
    }

    catalog
        .failures
        .iter()
        .filter(|f| ids.iter().any(|id| *id == f.id) || categories.contains(&f.category))
        .collect()
}
