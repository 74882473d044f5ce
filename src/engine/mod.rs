//! Query engine module
//!
//! Runs one logical query end to end.
//!
//! # Overview
//!
//! The engine module provides:
//! - `QueryEngine` - Fetches every page, parses entities, resolves lookups
//!   and assembles the table
//! - `QueryConfig` - Configuration for query execution
//! - `QueryStats` - Counters collected while running

mod types;

pub use types::{QueryConfig, QueryStats};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::http::Transport;
use crate::pagination::PageStream;
use crate::parse::{parse_response, ParseOptions, ParsedPage};
use crate::query::{Query, LOOKUP_QUERY_LIMIT};
use crate::registry::{ConnectorCatalog, EndpointDescriptor};
use crate::resolve::{LookupResolver, QueryRunner, ResolvedSet};
use crate::table::{assemble, Table};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info};

/// Query engine for one connector
pub struct QueryEngine {
    /// Endpoint catalog
    catalog: Arc<ConnectorCatalog>,
    /// Signed transport bound to the connector's base URL
    transport: Transport,
    /// Query configuration
    config: QueryConfig,
    /// Cancellation shared by every request of a run
    cancel: CancelToken,
    /// Statistics
    stats: Mutex<QueryStats>,
}

impl QueryEngine {
    /// Create a new query engine
    pub fn new(catalog: Arc<ConnectorCatalog>, transport: Transport) -> Self {
        Self {
            catalog,
            transport,
            config: QueryConfig::default(),
            cancel: CancelToken::never(),
            stats: Mutex::new(QueryStats::default()),
        }
    }

    /// Set query configuration
    #[must_use]
    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    /// Abort runs when `cancel` fires
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get the catalog
    pub fn catalog(&self) -> &ConnectorCatalog {
        &self.catalog
    }

    /// Get the transport
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Get the configuration
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Statistics accumulated since creation or the last reset
    pub fn stats(&self) -> QueryStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reset statistics
    pub fn reset_stats(&self) {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = QueryStats::default();
    }

    fn record(&self, update: impl FnOnce(&mut QueryStats)) {
        update(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }

    /// Run a query and assemble its table
    pub async fn run_query(&self, query: &Query) -> Result<Table> {
        let start = Instant::now();
        info!(
            connector = %self.catalog.name,
            endpoint = %query.endpoint(),
            lookup_depth = query.lookup_depth(),
            "Starting query"
        );

        let resolved = self.resolve_query(query).await?;
        let table = assemble(&resolved);

        self.record(|stats| {
            stats.add_rows(table.row_count());
            stats.set_duration(start.elapsed().as_millis() as u64);
        });
        info!(
            endpoint = %query.endpoint(),
            rows = table.row_count(),
            columns = table.column_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Completed query"
        );
        Ok(table)
    }

    /// Run a query and its lookups without assembling
    pub async fn resolve_query(&self, query: &Query) -> Result<ResolvedSet> {
        self.execute(query.clone(), LOOKUP_QUERY_LIMIT).await
    }

    /// Probe the connector's check endpoint
    ///
    /// Only the first page is fetched; it must arrive with a 2xx status and
    /// parse in the endpoint's format.
    pub async fn check(&self) -> Result<()> {
        let endpoint = self.catalog.check_endpoint()?;
        let query = Query::for_endpoint(endpoint);

        let mut pages =
            PageStream::new(self.transport.clone(), endpoint, &query, self.cancel.clone());
        let parsed = match pages.next_page().await {
            Ok(Some(page)) => parse_response(&page.body, &parse_options(endpoint, &query)),
            Ok(None) => Ok(Default::default()),
            Err(e) => Err(e),
        }
        .map_err(|e| Error::at_endpoint(&endpoint.name, e))?;

        debug!(
            endpoint = %endpoint.name,
            entities = parsed.entities.len(),
            "Connection check passed"
        );
        Ok(())
    }

    async fn execute(&self, query: Query, remaining: usize) -> Result<ResolvedSet> {
        let endpoint = self.catalog.endpoint(query.endpoint())?;
        self.record(QueryStats::add_query);

        let fetched = self
            .fetch_entities(endpoint, &query)
            .await
            .map_err(|e| Error::at_endpoint(&endpoint.name, e))?;

        let rows = LookupResolver::new(self, &self.catalog)
            .with_concurrency(self.config.lookup_concurrency)
            .resolve(&query, fetched.entities, remaining)
            .await
            .map_err(|e| Error::at_endpoint(&endpoint.name, e))?;

        Ok(ResolvedSet {
            rows,
            types: fetched.types,
            entity_path: fetched.entity_path,
            ..ResolvedSet::for_query(&query)
        })
    }

    async fn fetch_entities(
        &self,
        endpoint: &EndpointDescriptor,
        query: &Query,
    ) -> Result<ParsedPage> {
        let options = parse_options(endpoint, query);
        let mut pages =
            PageStream::new(self.transport.clone(), endpoint, query, self.cancel.clone());

        let mut fetched = ParsedPage {
            entity_path: options.entity_path(),
            ..Default::default()
        };
        while let Some(page) = pages.next_page().await? {
            let parsed = parse_response(&page.body, &options)?;
            debug!(
                endpoint = %endpoint.name,
                url = %page.url,
                entities = parsed.entities.len(),
                "Parsed page"
            );
            fetched.entities.extend(parsed.entities);
            fetched.types.merge(parsed.types);
        }

        let count = fetched.entities.len();
        self.record(|stats| {
            stats.add_pages(pages.pages_fetched() as usize);
            stats.add_entities(count);
        });
        Ok(fetched)
    }
}

fn parse_options<'a>(endpoint: &'a EndpointDescriptor, query: &'a Query) -> ParseOptions<'a> {
    ParseOptions {
        format: endpoint.format,
        json_path: query.json_path().or(endpoint.json_path.as_deref()),
        leaf_to_null: query.leaf_to_null(),
        schema: endpoint.schema.as_ref(),
    }
}

#[async_trait]
impl QueryRunner for QueryEngine {
    async fn run(&self, query: Query, remaining: usize) -> Result<ResolvedSet> {
        self.execute(query, remaining).await
    }
}

#[cfg(test)]
mod tests;
