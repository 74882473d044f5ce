//! Queries
//!
//! A [`Query`] names an endpoint and carries everything needed to fetch and
//! shape its data. Queries are immutable values: the `with_*` methods return
//! a modified copy, so a lookup never disturbs its parent.

use crate::error::{Error, Result};
use crate::registry::{ConnectorCatalog, EndpointDescriptor, LookupDescriptor};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maximum nesting of lookups below a top-level query
pub const LOOKUP_QUERY_LIMIT: usize = 5;

// ============================================================================
// Parameters
// ============================================================================

/// Ordered name → value parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(IndexMap<String, String>);

impl Parameters {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Set a value, keeping the position of an existing entry
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Remove a value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.shift_remove(name)
    }

    /// Check for a value
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check for no parameters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ============================================================================
// Query
// ============================================================================

/// A lookup attached to a query, with its own nested lookups
#[derive(Debug, Clone, PartialEq)]
pub struct LookupQuery {
    pub descriptor: Arc<LookupDescriptor>,
    pub lookups: Vec<LookupQuery>,
}

impl LookupQuery {
    /// Attach a declared lookup without nested lookups
    pub fn new(descriptor: LookupDescriptor) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            lookups: Vec::new(),
        }
    }

    /// Attach nested lookups
    #[must_use]
    pub fn with_lookups(mut self, lookups: Vec<LookupQuery>) -> Self {
        self.lookups = lookups;
        self
    }

    /// Nesting depth of this lookup (1 without nested lookups)
    pub fn depth(&self) -> usize {
        1 + self.lookups.iter().map(LookupQuery::depth).max().unwrap_or(0)
    }
}

/// A request for one endpoint's data
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    endpoint: String,
    parameters: Parameters,
    additional_parameters: Parameters,
    json_path: Option<String>,
    expand_arrays: bool,
    top_level_only: bool,
    leaf_to_null: bool,
    lookups: Vec<LookupQuery>,
}

impl Query {
    /// Create a bare query for an endpoint name
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            parameters: Parameters::new(),
            additional_parameters: Parameters::new(),
            json_path: None,
            expand_arrays: false,
            top_level_only: false,
            leaf_to_null: true,
            lookups: Vec::new(),
        }
    }

    /// Base query for an endpoint, carrying its declared defaults
    pub fn for_endpoint(endpoint: &EndpointDescriptor) -> Self {
        let mut query = Self::new(&endpoint.name);
        query.json_path.clone_from(&endpoint.json_path);
        query.expand_arrays = endpoint.expand_arrays;
        query.top_level_only = endpoint.top_level_only;
        query
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Extra query-string parameters, sent verbatim
    pub fn additional_parameters(&self) -> &Parameters {
        &self.additional_parameters
    }

    pub fn json_path(&self) -> Option<&str> {
        self.json_path.as_deref()
    }

    pub fn expand_arrays(&self) -> bool {
        self.expand_arrays
    }

    pub fn top_level_only(&self) -> bool {
        self.top_level_only
    }

    /// Whether a path matching nothing yields no entities instead of an error
    pub fn leaf_to_null(&self) -> bool {
        self.leaf_to_null
    }

    pub fn lookups(&self) -> &[LookupQuery] {
        &self.lookups
    }

    /// Set one parameter
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.set(name, value);
        self
    }

    /// Replace all parameters
    #[must_use]
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set one additional query-string parameter
    #[must_use]
    pub fn with_additional_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.additional_parameters.set(name, value);
        self
    }

    /// Replace all additional query-string parameters
    #[must_use]
    pub fn with_additional_parameters(mut self, parameters: Parameters) -> Self {
        self.additional_parameters = parameters;
        self
    }

    /// Set the path query
    #[must_use]
    pub fn with_json_path(mut self, json_path: Option<String>) -> Self {
        self.json_path = json_path;
        self
    }

    #[must_use]
    pub fn with_expand_arrays(mut self, expand_arrays: bool) -> Self {
        self.expand_arrays = expand_arrays;
        self
    }

    #[must_use]
    pub fn with_top_level_only(mut self, top_level_only: bool) -> Self {
        self.top_level_only = top_level_only;
        self
    }

    #[must_use]
    pub fn with_leaf_to_null(mut self, leaf_to_null: bool) -> Self {
        self.leaf_to_null = leaf_to_null;
        self
    }

    /// Replace the attached lookups
    #[must_use]
    pub fn with_lookups(mut self, lookups: Vec<LookupQuery>) -> Self {
        self.lookups = lookups;
        self
    }

    /// Attach one more lookup
    #[must_use]
    pub fn with_lookup(mut self, lookup: LookupQuery) -> Self {
        self.lookups.push(lookup);
        self
    }

    /// Nesting depth of the attached lookups
    pub fn lookup_depth(&self) -> usize {
        self.lookups.iter().map(LookupQuery::depth).max().unwrap_or(0)
    }
}

/// Attach every declared lookup of `endpoint`, recursively, down to `depth`
///
/// Cyclic catalogs (A → B → A) are cut off at the depth limit.
pub fn declared_lookups(
    catalog: &ConnectorCatalog,
    endpoint: &EndpointDescriptor,
    depth: usize,
) -> Vec<LookupQuery> {
    if depth == 0 {
        return Vec::new();
    }
    endpoint
        .lookups
        .iter()
        .map(|descriptor| {
            let nested = catalog
                .find_endpoint(&descriptor.endpoint)
                .map(|target| declared_lookups(catalog, target, depth - 1))
                .unwrap_or_default();
            LookupQuery::new(descriptor.clone()).with_lookups(nested)
        })
        .collect()
}

// ============================================================================
// Query Requests
// ============================================================================

/// Serializable description of a query, as accepted by the CLI and server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueryRequest {
    /// Endpoint name
    pub endpoint: String,
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
    #[serde(default)]
    pub additional_parameters: IndexMap<String, String>,
    /// Overrides the endpoint's default path query
    #[serde(default)]
    pub json_path: Option<String>,
    #[serde(default)]
    pub expand_arrays: Option<bool>,
    #[serde(default)]
    pub top_level_only: Option<bool>,
    #[serde(default)]
    pub leaf_to_null: Option<bool>,
    /// Lookups by target endpoint name
    #[serde(default)]
    pub lookups: Vec<LookupRequest>,
    /// Attach every declared lookup instead of listing them
    #[serde(default)]
    pub all_lookups: bool,
}

/// A lookup named by its target endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LookupRequest {
    pub endpoint: String,
    /// Pick among several lookups into the same endpoint
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub lookups: Vec<LookupRequest>,
}

impl LookupRequest {
    /// Lookup into `endpoint` without nested lookups
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }
}

impl QueryRequest {
    /// Query `endpoint` with no parameters, lookups or overrides
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Build a query, checking names against the catalog
    pub fn to_query(&self, catalog: &ConnectorCatalog) -> Result<Query> {
        let endpoint = catalog.endpoint(&self.endpoint)?;

        let mut query = Query::for_endpoint(endpoint)
            .with_parameters(self.parameters.clone().into_iter().collect())
            .with_additional_parameters(self.additional_parameters.clone().into_iter().collect());

        if self.json_path.is_some() {
            query = query.with_json_path(self.json_path.clone());
        }
        if let Some(expand) = self.expand_arrays {
            query = query.with_expand_arrays(expand);
        }
        if let Some(top_level_only) = self.top_level_only {
            query = query.with_top_level_only(top_level_only);
        }
        if let Some(leaf_to_null) = self.leaf_to_null {
            query = query.with_leaf_to_null(leaf_to_null);
        }

        let lookups = if self.all_lookups {
            declared_lookups(catalog, endpoint, LOOKUP_QUERY_LIMIT)
        } else {
            resolve_lookup_requests(catalog, endpoint, &self.lookups, 1)?
        };
        Ok(query.with_lookups(lookups))
    }
}

fn resolve_lookup_requests(
    catalog: &ConnectorCatalog,
    parent: &EndpointDescriptor,
    requests: &[LookupRequest],
    depth: usize,
) -> Result<Vec<LookupQuery>> {
    if !requests.is_empty() && depth > LOOKUP_QUERY_LIMIT {
        return Err(Error::config(format!(
            "Lookups nest deeper than {LOOKUP_QUERY_LIMIT} levels below '{}'",
            parent.name
        )));
    }

    requests
        .iter()
        .map(|request| {
            let descriptor = parent
                .lookups
                .iter()
                .find(|l| {
                    l.endpoint == request.endpoint
                        && request
                            .prefix
                            .as_deref()
                            .map_or(true, |p| l.column_prefix() == p)
                })
                .ok_or_else(|| {
                    Error::config(format!(
                        "Endpoint '{}' declares no lookup into '{}'",
                        parent.name, request.endpoint
                    ))
                })?;
            let target = catalog.endpoint(&descriptor.endpoint)?;
            let nested = resolve_lookup_requests(catalog, target, &request.lookups, depth + 1)?;
            Ok(LookupQuery::new(descriptor.clone()).with_lookups(nested))
        })
        .collect()
}
