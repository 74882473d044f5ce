//! Catalog types
//!
//! Declarative endpoint catalog types for YAML parsing.

use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::pagination::PaginationSpec;
use crate::parse::SchemaElement;
use crate::types::{DataFormat, Method};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Connector Catalog
// ============================================================================

/// The endpoint catalog of one connector type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConnectorCatalog {
    /// Connector type name
    pub name: String,
    /// Human readable title
    #[serde(default)]
    pub title: Option<String>,
    /// Catalog version
    #[serde(default = "default_version")]
    pub version: String,
    /// Base URL for all endpoints (may use `{{ config.x }}` templates)
    pub base_url: String,
    /// Headers sent with every request (may use templates)
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Authentication applied to every request
    #[serde(default)]
    pub auth: AuthConfig,
    /// Endpoint used by connection checks (defaults to the first endpoint
    /// without required parameters)
    #[serde(default)]
    pub test_endpoint: Option<String>,
    /// Endpoint definitions
    pub endpoints: Vec<EndpointDescriptor>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl ConnectorCatalog {
    /// Find an endpoint by name
    pub fn find_endpoint(&self, name: &str) -> Option<&EndpointDescriptor> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    /// Find an endpoint by name, failing for unknown names
    pub fn endpoint(&self, name: &str) -> Result<&EndpointDescriptor> {
        self.find_endpoint(name)
            .ok_or_else(|| Error::undefined_endpoint(&self.name, name))
    }

    /// Endpoint names in declaration order
    pub fn endpoint_names(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.name.as_str()).collect()
    }

    /// Endpoint to probe when testing a connection
    pub fn check_endpoint(&self) -> Result<&EndpointDescriptor> {
        if let Some(name) = &self.test_endpoint {
            return self.endpoint(name);
        }
        self.endpoints
            .iter()
            .find(|e| e.parameters.iter().all(|p| !p.required || p.default.is_some()))
            .ok_or_else(|| {
                Error::config(format!(
                    "Connector '{}' has no endpoint that can be called without parameters",
                    self.name
                ))
            })
    }
}

// ============================================================================
// Endpoint Descriptor
// ============================================================================

/// A named remote endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EndpointDescriptor {
    /// Endpoint name, unique within the catalog
    pub name: String,
    /// URL suffix with `{paramName}` placeholders
    pub suffix: String,
    /// HTTP method
    #[serde(default)]
    pub method: Method,
    /// Response format
    #[serde(default)]
    pub format: DataFormat,
    /// Declared parameters
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    /// Pagination strategy
    #[serde(default)]
    pub pagination: PaginationSpec,
    /// Lookups available on this endpoint's entities
    #[serde(default, deserialize_with = "deserialize_lookups")]
    pub lookups: Vec<LookupDescriptor>,
    /// Request body template (`{paramName}` placeholders)
    #[serde(default)]
    pub body: Option<String>,
    /// Default path query selecting the entities
    #[serde(default)]
    pub json_path: Option<String>,
    /// Default array expansion
    #[serde(default)]
    pub expand_arrays: bool,
    /// Default for expanding only the outermost list level
    #[serde(default)]
    pub top_level_only: bool,
    /// Declared XML schema
    #[serde(default)]
    pub schema: Option<SchemaElement>,
}

impl EndpointDescriptor {
    /// Find a declared parameter
    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Find the declared lookup into `endpoint`
    pub fn lookup(&self, endpoint: &str) -> Option<&LookupDescriptor> {
        self.lookups.iter().find(|l| l.endpoint == endpoint)
    }
}

/// Where a declared parameter is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
    /// Substituted into the suffix
    Path,
    /// Query string (default)
    #[default]
    Query,
    /// Request header
    Header,
}

/// A declared endpoint parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ParameterDescriptor {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub location: ParamLocation,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

// ============================================================================
// Lookup Descriptor
// ============================================================================

/// A join from an entity of one endpoint into another endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LookupDescriptor {
    /// Target endpoint name
    pub endpoint: String,
    /// Target parameter receiving the key value
    pub parameter_name: String,
    /// Where the key comes from: `""` (the entity itself), `field`,
    /// `$.nested.field` or `$(parentParam)`
    pub key: String,
    /// Extra parameters; values may reference entity fields like keys do
    pub parameters: IndexMap<String, String>,
    /// Copy the parent query's parameters into the child query
    pub inherit_parameters: bool,
    /// Path query applied to the child response
    pub json_path: Option<String>,
    pub expand_arrays: bool,
    pub top_level_only: bool,
    /// Column prefix (defaults to the target endpoint name)
    pub prefix: Option<String>,
}

impl LookupDescriptor {
    /// Create a lookup with default settings
    pub fn new(endpoint: impl Into<String>, parameter_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            parameter_name: parameter_name.into(),
            key: String::new(),
            parameters: IndexMap::new(),
            inherit_parameters: true,
            json_path: None,
            expand_arrays: false,
            top_level_only: false,
            prefix: None,
        }
    }

    /// Set the key expression
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Set the column prefix
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Column prefix for this lookup's fields
    pub fn column_prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(&self.endpoint)
    }
}

/// Lookup entry as written in YAML
///
/// Either `endpoint: A` or the shorthand `endpoints: [A, B]`, which stands for
/// one independent lookup per listed endpoint sharing the remaining fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
struct LookupEntry {
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    endpoints: Vec<String>,
    parameter_name: String,
    #[serde(default)]
    key: String,
    #[serde(default)]
    parameters: IndexMap<String, String>,
    #[serde(default = "default_true")]
    inherit_parameters: bool,
    #[serde(default)]
    json_path: Option<String>,
    #[serde(default)]
    expand_arrays: bool,
    #[serde(default)]
    top_level_only: bool,
    #[serde(default)]
    prefix: Option<String>,
}

fn default_true() -> bool {
    true
}

impl LookupEntry {
    fn expand(self) -> std::result::Result<Vec<LookupDescriptor>, String> {
        let targets = match (self.endpoint, self.endpoints.is_empty()) {
            (Some(_), false) => {
                return Err(format!(
                    "lookup on '{}' sets both 'endpoint' and 'endpoints'",
                    self.parameter_name
                ))
            }
            (Some(endpoint), true) => vec![endpoint],
            (None, false) => self.endpoints,
            (None, true) => {
                return Err(format!(
                    "lookup on '{}' needs 'endpoint' or 'endpoints'",
                    self.parameter_name
                ))
            }
        };

        Ok(targets
            .into_iter()
            .map(|endpoint| LookupDescriptor {
                endpoint,
                parameter_name: self.parameter_name.clone(),
                key: self.key.clone(),
                parameters: self.parameters.clone(),
                inherit_parameters: self.inherit_parameters,
                json_path: self.json_path.clone(),
                expand_arrays: self.expand_arrays,
                top_level_only: self.top_level_only,
                prefix: self.prefix.clone(),
            })
            .collect())
    }
}

fn deserialize_lookups<'de, D>(deserializer: D) -> std::result::Result<Vec<LookupDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<LookupEntry>::deserialize(deserializer)?;
    let mut lookups = Vec::new();
    for entry in entries {
        lookups.extend(entry.expand().map_err(serde::de::Error::custom)?);
    }
    Ok(lookups)
}
