//! Data source configuration
//!
//! A data source binds a connector catalog to concrete values: the
//! `{{ config.x }}` inputs its base URL, headers and auth refer to, plus HTTP
//! and lookup settings. Data sources are read from JSON or YAML files.

use crate::auth::StaticSigner;
use crate::engine::{QueryConfig, QueryEngine};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RateLimiterConfig, RequestExecutor, Transport};
use crate::registry::ConnectorCatalog;
use crate::resolve::DEFAULT_LOOKUP_CONCURRENCY;
use crate::template::{render, TemplateContext};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Data Source Config
// ============================================================================

/// A configured instance of a connector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Built-in connector name or path to a catalog file
    pub connector: String,

    /// Values available to catalog templates as `config.*`
    #[serde(default = "empty_object")]
    pub config: Value,

    /// Replaces the catalog's base URL (may use templates)
    #[serde(default)]
    pub base_url: Option<String>,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Parent entities whose lookups are resolved at once
    #[serde(default = "default_lookup_concurrency")]
    pub lookup_concurrency: usize,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

fn default_lookup_concurrency() -> usize {
    DEFAULT_LOOKUP_CONCURRENCY
}

impl DataSourceConfig {
    /// Data source for a connector with default settings
    pub fn new(connector: impl Into<String>) -> Self {
        Self {
            connector: connector.into(),
            config: empty_object(),
            base_url: None,
            http: HttpConfig::default(),
            lookup_concurrency: default_lookup_concurrency(),
        }
    }

    /// Set the template values
    #[must_use]
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// Override the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Template context exposing this data source's values
    pub fn template_context(&self) -> TemplateContext {
        TemplateContext::with_config(self.config.clone())
    }

    /// Build the request transport for `catalog` on top of `executor`
    ///
    /// Base URL, connector headers and auth are rendered against the data
    /// source's values here, once, so a missing value fails before any
    /// request is sent.
    pub fn transport(
        &self,
        catalog: &ConnectorCatalog,
        executor: Arc<dyn RequestExecutor>,
    ) -> Result<Transport> {
        let ctx = self.template_context();

        let base_url = render(self.base_url.as_deref().unwrap_or(&catalog.base_url), &ctx)?;
        let auth = catalog.auth.render(&ctx)?;

        let mut transport =
            Transport::new(executor, base_url).with_signer(Arc::new(StaticSigner::new(auth)));
        for (key, value) in &catalog.headers {
            transport = transport.with_header(key.as_str(), render(value, &ctx)?);
        }
        Ok(transport)
    }

    /// Build a query engine backed by the HTTP client
    pub fn engine(&self, catalog: Arc<ConnectorCatalog>) -> Result<QueryEngine> {
        let client = HttpClient::with_config(self.http.client_config())?;
        self.engine_with_executor(catalog, Arc::new(client))
    }

    /// Build a query engine backed by any executor
    pub fn engine_with_executor(
        &self,
        catalog: Arc<ConnectorCatalog>,
        executor: Arc<dyn RequestExecutor>,
    ) -> Result<QueryEngine> {
        let transport = self.transport(&catalog, executor)?;
        Ok(QueryEngine::new(catalog, transport).with_config(
            QueryConfig::new().with_lookup_concurrency(self.lookup_concurrency),
        ))
    }
}

/// Load a data source from a JSON or YAML file
pub fn load_data_source(path: impl AsRef<Path>) -> Result<DataSourceConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read data source '{}': {e}",
            path.display()
        ))
    })?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => Ok(serde_yaml::from_str(&content)?),
        _ => Ok(serde_json::from_str(&content)?),
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Requests per second; unlimited when absent
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
            rate_limit: None,
            user_agent: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl HttpConfig {
    /// Translate into the HTTP client's configuration
    pub fn client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .max_retries(self.max_retries)
            .backoff(
                self.retry_backoff.backoff_type,
                Duration::from_millis(self.retry_backoff.initial_ms),
                Duration::from_millis(self.retry_backoff.max_ms),
            );
        if let Some(limit) = &self.rate_limit {
            builder = builder.rate_limit(RateLimiterConfig::new(
                limit.requests_per_second,
                limit.burst.unwrap_or(limit.requests_per_second),
            ));
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.as_str());
        }
        builder.build()
    }
}

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    60000
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per second limit
    pub requests_per_second: u32,

    /// Bucket size; defaults to `requests_per_second`
    #[serde(default)]
    pub burst: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::MockExecutor;
    use crate::http::RawResponse;
    use crate::query::Query;
    use crate::registry::load_catalog_from_str;
    use serde_json::json;

    const CATALOG: &str = r#"
name: shop
base_url: "https://{{ config.host }}/v1"
headers:
  X-Tenant: "{{ config.tenant }}"
auth:
  type: api_key
  key: api_key
  value: "{{ config.key }}"
  location: query
endpoints:
  - name: Customers
    suffix: /customers
"#;

    #[test]
    fn test_parse_minimal_data_source() {
        let source: DataSourceConfig = serde_json::from_value(json!({"connector": "shop"})).unwrap();

        assert_eq!(source.connector, "shop");
        assert_eq!(source.config, json!({}));
        assert_eq!(source.http, HttpConfig::default());
        assert_eq!(source.lookup_concurrency, DEFAULT_LOOKUP_CONCURRENCY);
    }

    #[test]
    fn test_parse_http_settings() {
        let yaml = r#"
connector: shop
http:
  timeout_seconds: 5
  max_retries: 0
  retry_backoff:
    type: constant
    initial_ms: 250
  rate_limit:
    requests_per_second: 2
"#;
        let source: DataSourceConfig = serde_yaml::from_str(yaml).unwrap();
        let client = source.http.client_config();

        assert_eq!(client.timeout, Duration::from_secs(5));
        assert_eq!(client.max_retries, 0);
        assert_eq!(client.backoff_type, BackoffType::Constant);
        assert_eq!(client.initial_backoff, Duration::from_millis(250));
        assert_eq!(client.rate_limit, Some(RateLimiterConfig::new(2, 2)));
    }

    #[tokio::test]
    async fn test_transport_renders_templates() {
        let catalog = Arc::new(load_catalog_from_str(CATALOG).unwrap());
        let source = DataSourceConfig::new("shop").with_config(json!({
            "host": "api.example.com",
            "tenant": "acme",
            "key": "secret"
        }));
        let mock = Arc::new(MockExecutor::new(|req| Ok(RawResponse::ok(&req.url, "[]"))));

        let engine = source.engine_with_executor(catalog, mock.clone()).unwrap();
        engine.run_query(&Query::new("Customers")).await.unwrap();

        let requests = mock.requests();
        assert_eq!(
            requests[0].url,
            "https://api.example.com/v1/customers?api_key=secret"
        );
        assert_eq!(requests[0].header("X-Tenant"), Some("acme"));
    }

    #[test]
    fn test_missing_template_value_fails_early() {
        let catalog = load_catalog_from_str(CATALOG).unwrap();
        let source = DataSourceConfig::new("shop").with_config(json!({"host": "h"}));
        let mock = Arc::new(MockExecutor::new(|req| Ok(RawResponse::ok(&req.url, "[]"))));

        assert!(source.transport(&catalog, mock).is_err());
    }

    #[test]
    fn test_base_url_override() {
        let catalog = load_catalog_from_str(CATALOG).unwrap();
        let source = DataSourceConfig::new("shop")
            .with_config(json!({"tenant": "t", "key": "k"}))
            .with_base_url("http://localhost:8080");
        let mock = Arc::new(MockExecutor::new(|req| Ok(RawResponse::ok(&req.url, "[]"))));

        let transport = source.transport(&catalog, mock).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_load_data_source_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("source.yaml");
        std::fs::write(&yaml, "connector: demo-shop\nlookup_concurrency: 2\n").unwrap();
        let json_path = dir.path().join("source.json");
        std::fs::write(&json_path, r#"{"connector": "demo-shop"}"#).unwrap();

        assert_eq!(load_data_source(&yaml).unwrap().lookup_concurrency, 2);
        assert_eq!(load_data_source(&json_path).unwrap().connector, "demo-shop");
        assert!(load_data_source(dir.path().join("missing.json")).is_err());
    }
}
