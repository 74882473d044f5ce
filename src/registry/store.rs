//! Process-wide catalog registry

use super::parser::{load_catalog, load_catalog_from_str};
use super::types::ConnectorCatalog;
use crate::catalogs;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Loaded catalogs keyed by connector type name
///
/// Filled once at start-up and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    catalogs: IndexMap<String, Arc<ConnectorCatalog>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in catalog
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        for name in catalogs::list_builtin() {
            if let Some(yaml) = catalogs::get_builtin(name) {
                registry.register(load_catalog_from_str(yaml)?);
            }
        }
        Ok(registry)
    }

    /// Add a catalog, replacing one with the same name
    pub fn register(&mut self, catalog: ConnectorCatalog) -> Arc<ConnectorCatalog> {
        debug!(
            catalog = %catalog.name,
            endpoints = catalog.endpoints.len(),
            "Registering catalog"
        );
        let catalog = Arc::new(catalog);
        self.catalogs
            .insert(catalog.name.clone(), Arc::clone(&catalog));
        catalog
    }

    /// Load every `*.yaml`/`*.yml` file in a directory
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .collect();
        paths.sort();

        for path in &paths {
            self.register(load_catalog(path)?);
        }
        info!(dir = %dir.display(), count = paths.len(), "Loaded catalogs");
        Ok(paths.len())
    }

    /// Get a registered catalog, falling back to a built-in name or a file path
    pub fn resolve(&self, name_or_path: &str) -> Result<Arc<ConnectorCatalog>> {
        if let Some(catalog) = self.catalogs.get(name_or_path) {
            return Ok(Arc::clone(catalog));
        }
        Ok(Arc::new(load_catalog(name_or_path)?))
    }

    /// Get a registered catalog
    pub fn get(&self, name: &str) -> Result<Arc<ConnectorCatalog>> {
        self.catalogs
            .get(name)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown connector type '{name}'")))
    }

    /// Registered connector type names
    pub fn names(&self) -> Vec<&str> {
        self.catalogs.keys().map(String::as_str).collect()
    }

    /// Iterate registered catalogs
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ConnectorCatalog>> {
        self.catalogs.values()
    }

    /// Number of registered catalogs
    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    /// Check for no catalogs
    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}
