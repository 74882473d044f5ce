//! Engine types
//!
//! Configuration and statistics for the query engine.

use crate::resolve::DEFAULT_LOOKUP_CONCURRENCY;
use serde::{Deserialize, Serialize};

/// Configuration for query execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// Parent entities whose lookups are resolved at once
    pub lookup_concurrency: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
        }
    }
}

impl QueryConfig {
    /// Create a new query config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set lookup concurrency (at least 1)
    #[must_use]
    pub fn with_lookup_concurrency(mut self, concurrency: usize) -> Self {
        self.lookup_concurrency = concurrency.max(1);
        self
    }
}

/// Statistics from query execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStats {
    /// Queries run, lookup queries included
    pub queries_run: usize,
    /// Total pages fetched
    pub pages_fetched: usize,
    /// Entities parsed from all pages
    pub entities_parsed: usize,
    /// Rows in the assembled table
    pub rows_produced: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl QueryStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query
    pub fn add_query(&mut self) {
        self.queries_run += 1;
    }

    /// Add pages
    pub fn add_pages(&mut self, count: usize) {
        self.pages_fetched += count;
    }

    /// Add parsed entities
    pub fn add_entities(&mut self, count: usize) {
        self.entities_parsed += count;
    }

    /// Add produced rows
    pub fn add_rows(&mut self, count: usize) {
        self.rows_produced += count;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
