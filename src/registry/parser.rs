//! YAML parser for connector catalogs
//!
//! Parses and validates catalog YAML files.
//! Supports both built-in catalogs (by name) and custom YAML files (by path).

use super::types::{ConnectorCatalog, EndpointDescriptor};
use crate::catalogs;
use crate::error::{Error, Result};
use crate::pagination::{PaginationSpec, ParamTarget};
use crate::template::{has_placeholder, placeholders};
use crate::types::DataFormat;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Load a catalog from a built-in name or a file path
///
/// # Examples
///
/// ```ignore
/// let catalog = load_catalog("demo-shop")?;
/// let catalog = load_catalog("./catalogs/my-api.yaml")?;
/// ```
pub fn load_catalog(path: impl AsRef<Path>) -> Result<ConnectorCatalog> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();

    if !path_str.contains('/')
        && !path_str.contains('\\')
        && !path_str.ends_with(".yaml")
        && !path_str.ends_with(".yml")
    {
        if let Some(yaml) = catalogs::get_builtin(&path_str) {
            return load_catalog_from_str(yaml);
        }
    }

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::config(format!(
                "Catalog '{}' not found. Built-in catalogs: {}. Or provide a path to a YAML file.",
                path.display(),
                catalogs::list_builtin().join(", ")
            ))
        } else {
            Error::config(format!(
                "Failed to read catalog file '{}': {e}",
                path.display()
            ))
        }
    })?;
    load_catalog_from_str(&content)
}

/// Load a catalog from a YAML string
pub fn load_catalog_from_str(yaml: &str) -> Result<ConnectorCatalog> {
    let catalog: ConnectorCatalog = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse catalog YAML: {e}")))?;

    validate_catalog(&catalog)?;
    Ok(catalog)
}

/// Validate a catalog
///
/// Checks endpoint naming, that every lookup targets a defined endpoint whose
/// suffix carries the lookup's `{parameter_name}` placeholder, and that each
/// pagination spec is usable.
pub fn validate_catalog(catalog: &ConnectorCatalog) -> Result<()> {
    if catalog.name.is_empty() {
        return Err(Error::config("Catalog name cannot be empty"));
    }

    if catalog.base_url.is_empty() {
        return Err(Error::config(format!(
            "Catalog '{}' base_url cannot be empty",
            catalog.name
        )));
    }

    if catalog.endpoints.is_empty() {
        return Err(Error::config(format!(
            "Catalog '{}' must have at least one endpoint",
            catalog.name
        )));
    }

    let mut names = HashSet::new();
    for endpoint in &catalog.endpoints {
        if !names.insert(endpoint.name.as_str()) {
            return Err(Error::config(format!(
                "Duplicate endpoint name '{}'",
                endpoint.name
            )));
        }
    }

    for endpoint in &catalog.endpoints {
        validate_endpoint(endpoint)?;
        validate_lookups(catalog, endpoint)?;
    }

    if let Some(test_endpoint) = &catalog.test_endpoint {
        catalog.endpoint(test_endpoint)?;
    }

    Ok(())
}

fn validate_endpoint(endpoint: &EndpointDescriptor) -> Result<()> {
    if endpoint.name.is_empty() {
        return Err(Error::config("Endpoint name cannot be empty"));
    }

    if endpoint.suffix.is_empty() {
        return Err(Error::config(format!(
            "Endpoint '{}' suffix cannot be empty",
            endpoint.name
        )));
    }

    let mut params = HashSet::new();
    for param in &endpoint.parameters {
        if !params.insert(param.name.as_str()) {
            return Err(Error::config(format!(
                "Endpoint '{}' declares parameter '{}' twice",
                endpoint.name, param.name
            )));
        }
    }

    if endpoint.schema.is_some() && endpoint.format != DataFormat::Xml {
        return Err(Error::config(format!(
            "Endpoint '{}' declares an XML schema but its format is not xml",
            endpoint.name
        )));
    }

    validate_pagination(endpoint)
}

fn validate_pagination(endpoint: &EndpointDescriptor) -> Result<()> {
    let invalid = |message: &str| {
        Err(Error::config(format!(
            "Endpoint '{}' pagination: {message}",
            endpoint.name
        )))
    };

    match &endpoint.pagination {
        PaginationSpec::Iteration {
            has_next,
            next,
            increment_offset,
            page_size,
            ..
        } => {
            if *increment_offset && page_size.unwrap_or(0) == 0 {
                return invalid("increment_offset requires a positive page_size");
            }
            if *increment_offset && has_next.is_none() {
                return invalid("increment_offset requires a 'has_next' signal");
            }
            if !*increment_offset && next.is_none() {
                return invalid("iteration needs a 'next' signal unless increment_offset is set");
            }
        }
        PaginationSpec::TotalCount {
            max_results_per_page,
            ..
        }
        | PaginationSpec::TotalCountAndOffset {
            max_results_per_page,
            ..
        } => {
            if *max_results_per_page == 0 {
                return invalid("max_results_per_page must be positive");
            }
        }
        PaginationSpec::None
        | PaginationSpec::PageCount { .. }
        | PaginationSpec::LinkIteration { .. } => {}
    }

    for target in endpoint.pagination.targets() {
        if let ParamTarget::Path(name) = target {
            if !has_placeholder(&endpoint.suffix, name) {
                return invalid(&format!("suffix has no '{{{name}}}' placeholder"));
            }
        }
    }

    Ok(())
}

fn validate_lookups(catalog: &ConnectorCatalog, endpoint: &EndpointDescriptor) -> Result<()> {
    for lookup in &endpoint.lookups {
        let target = catalog.find_endpoint(&lookup.endpoint).ok_or_else(|| {
            Error::config(format!(
                "Lookup on endpoint '{}' references undefined endpoint '{}'",
                endpoint.name, lookup.endpoint
            ))
        })?;

        if !has_placeholder(&target.suffix, &lookup.parameter_name) {
            return Err(Error::config(format!(
                "Lookup from '{}' into '{}': suffix '{}' has no '{{{}}}' placeholder (found: {})",
                endpoint.name,
                target.name,
                target.suffix,
                lookup.parameter_name,
                placeholders(&target.suffix).join(", ")
            )));
        }
    }
    Ok(())
}
