// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # Solidafy Tabular
//!
//! A catalog-driven connector runtime that turns paginated REST responses
//! (JSON or XML) into flat, typed tables.
//!
//! ## Features
//!
//! - **Declarative Catalogs**: Endpoints, parameters, pagination and lookups in YAML
//! - **Smart Pagination**: Page count, offset, cursor and link header support
//! - **Tree Parsing**: JSON and XML responses, typed by an optional XML schema
//! - **Lookups**: Nested per-row child queries with bounded concurrency
//! - **Tabular Output**: JSON records, Arrow RecordBatch and Parquet
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_tabular::{CatalogConnector, DataSourceConfig, QueryRequest, Registry, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = Registry::with_builtins()?;
//!     let source = DataSourceConfig::new("demo-shop")
//!         .with_config(serde_json::json!({ "base_url": "https://shop.example.com/api", "api_key": "..." }));
//!     let connector = CatalogConnector::from_config(&registry, &source)?;
//!
//!     let mut request = QueryRequest::new("Customers");
//!     request.all_lookups = true;
//!     let table = connector.run_request(&request).await?;
//!     println!("{} rows", table.row_count());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Connector Interface                        │
//! │   test_connection() → CheckResult    run_query(query) → Table   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │ Registry │ Paginate  │     Parse     │  Resolve  │    Table    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ YAML     │ PageCount │ JSON          │ Lookups   │ Columns     │
//! │ Validate │ Offset    │ XML           │ Key paths │ Arrow       │
//! │ Builtins │ Cursor    │ XSD types     │ Depth cap │ Parquet     │
//! │          │ Link      │ Path queries  │ Bounded   │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Template interpolation and suffix placeholders
pub mod template;

/// Cooperative cancellation
pub mod cancel;

/// Request authentication
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Pagination controller
pub mod pagination;

/// Response tree parser (JSON, XML)
pub mod parse;

/// Descriptor registry and catalog loader
pub mod registry;

/// Built-in catalogs
pub mod catalogs;

/// Queries and serialized query requests
pub mod query;

/// Lookup resolver
pub mod resolve;

/// Tabular assembler and Arrow/Parquet output
pub mod table;

/// Query execution engine
pub mod engine;

/// Data source configuration
pub mod config;

/// Connector trait
pub mod connector;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{load_data_source, DataSourceConfig};
pub use connector::{CatalogConnector, CheckResult, Connector};
pub use engine::QueryEngine;
pub use query::{Query, QueryRequest};
pub use registry::{load_catalog, ConnectorCatalog, Registry};
pub use table::Table;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
