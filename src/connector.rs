//! Connector trait
//!
//! A connector is a catalog bound to a data source: it answers queries
//! against the catalog's endpoints and can test whether the remote side is
//! reachable with the configured credentials.

use crate::config::DataSourceConfig;
use crate::engine::{QueryEngine, QueryStats};
use crate::error::Result;
use crate::query::{Query, QueryRequest};
use crate::registry::{ConnectorCatalog, EndpointDescriptor, Registry};
use crate::table::Table;
use crate::types::{DataFormat, Method};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// Check Result
// ============================================================================

/// Result of a connection check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the check succeeded
    pub success: bool,

    /// Error message if failed
    pub message: Option<String>,
}

impl CheckResult {
    /// Create a successful check result
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Create a failed check result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

// ============================================================================
// Endpoint Summary (for listings)
// ============================================================================

/// What a client needs to know to query an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSummary {
    pub name: String,
    pub method: Method,
    pub format: DataFormat,
    /// Declared parameter names
    pub parameters: Vec<String>,
    /// Parameters without a default that must be supplied
    pub required: Vec<String>,
    /// Target endpoints of the declared lookups
    pub lookups: Vec<String>,
    pub paginated: bool,
}

impl From<&EndpointDescriptor> for EndpointSummary {
    fn from(endpoint: &EndpointDescriptor) -> Self {
        Self {
            name: endpoint.name.clone(),
            method: endpoint.method,
            format: endpoint.format,
            parameters: endpoint.parameters.iter().map(|p| p.name.clone()).collect(),
            required: endpoint
                .parameters
                .iter()
                .filter(|p| p.required && p.default.is_none())
                .map(|p| p.name.clone())
                .collect(),
            lookups: endpoint.lookups.iter().map(|l| l.endpoint.clone()).collect(),
            paginated: !endpoint.pagination.is_none(),
        }
    }
}

/// Connector listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorSummary {
    pub name: String,
    pub title: String,
    pub version: String,
    pub endpoints: usize,
}

impl From<&ConnectorCatalog> for ConnectorSummary {
    fn from(catalog: &ConnectorCatalog) -> Self {
        Self {
            name: catalog.name.clone(),
            title: catalog.title.clone().unwrap_or_else(|| catalog.name.clone()),
            version: catalog.version.clone(),
            endpoints: catalog.endpoints.len(),
        }
    }
}

/// Summaries of every endpoint of a catalog
pub fn endpoint_summaries(catalog: &ConnectorCatalog) -> Vec<EndpointSummary> {
    catalog.endpoints.iter().map(EndpointSummary::from).collect()
}

// ============================================================================
// Connector Trait
// ============================================================================

/// Core trait that all connectors implement
#[async_trait]
pub trait Connector: Send + Sync {
    /// The endpoint catalog
    fn catalog(&self) -> &ConnectorCatalog;

    /// Tests if credentials and configuration are valid
    async fn test_connection(&self) -> Result<CheckResult>;

    /// Runs one query to a table
    async fn run_query(&self, query: &Query) -> Result<Table>;
}

// ============================================================================
// Catalog Connector
// ============================================================================

/// A connector driven by a declarative catalog
pub struct CatalogConnector {
    engine: QueryEngine,
}

impl CatalogConnector {
    /// Wrap an engine
    pub fn new(engine: QueryEngine) -> Self {
        Self { engine }
    }

    /// Build the connector a data source names
    pub fn from_config(registry: &Registry, source: &DataSourceConfig) -> Result<Self> {
        let catalog = registry.resolve(&source.connector)?;
        Ok(Self::new(source.engine(catalog)?))
    }

    /// The underlying engine
    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    /// Statistics of every query run so far
    pub fn stats(&self) -> QueryStats {
        self.engine.stats()
    }

    /// Check a serialized query against the catalog and run it
    pub async fn run_request(&self, request: &QueryRequest) -> Result<Table> {
        let query = request.to_query(self.catalog())?;
        self.run_query(&query).await
    }
}

#[async_trait]
impl Connector for CatalogConnector {
    fn catalog(&self) -> &ConnectorCatalog {
        self.engine.catalog()
    }

    async fn test_connection(&self) -> Result<CheckResult> {
        match self.engine.check().await {
            Ok(()) => Ok(CheckResult::success()),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!(connector = %self.catalog().name, error = %e, "Connection check failed");
                Ok(CheckResult::failure(e.to_string()))
            }
        }
    }

    async fn run_query(&self, query: &Query) -> Result<Table> {
        self.engine.run_query(query).await
    }
}
