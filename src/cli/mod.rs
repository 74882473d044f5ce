//! CLI module
//!
//! Command-line interface for running catalog connectors.
//!
//! # Commands
//!
//! - `check` - Test connection to the API
//! - `query` - Run a query and print or write the table
//! - `validate` - Validate a catalog
//! - `endpoints` - List a connector's endpoints
//! - `list` - List built-in connectors
//! - `serve` - Start HTTP server mode

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
pub use server::{router, serve, ServerConfig};
