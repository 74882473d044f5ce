//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Solidafy Tabular CLI
#[derive(Parser, Debug)]
#[command(name = "solidafy-tabular")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Connector: built-in catalog name or catalog file (YAML)
    #[arg(short, long, global = true)]
    pub connector: Option<String>,

    /// Data source file (JSON or YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Inline template values JSON (`config.*`)
    #[arg(long, global = true)]
    pub config_json: Option<String>,

    /// Override the catalog's base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Extra directory of catalog files
    #[arg(long, global = true)]
    pub catalogs_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test connection to the API
    Check,

    /// Run a query and print or write the table
    Query {
        /// Endpoint name
        endpoint: Option<String>,

        /// Query parameter (repeatable)
        #[arg(short, long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Extra query-string parameter (repeatable)
        #[arg(long = "extra", value_name = "NAME=VALUE")]
        extra: Vec<String>,

        /// Lookup by target endpoint; nest with '/' (repeatable)
        #[arg(short, long = "lookup", value_name = "ENDPOINT[/ENDPOINT...]")]
        lookups: Vec<String>,

        /// Attach every declared lookup
        #[arg(long)]
        all_lookups: bool,

        /// Override the endpoint's path query
        #[arg(long)]
        json_path: Option<String>,

        /// Expand lists into rows
        #[arg(long)]
        expand_arrays: bool,

        /// Expand only the outermost list level
        #[arg(long)]
        top_level_only: bool,

        /// Fail when the path query matches nothing
        #[arg(long)]
        strict_path: bool,

        /// Full query request (JSON file); replaces the options above
        #[arg(long)]
        request: Option<PathBuf>,

        /// Output file (required for parquet)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a catalog
    Validate,

    /// List a connector's endpoints
    Endpoints,

    /// List built-in connectors
    List,

    /// Start HTTP server mode
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one record per line)
    Json,
    /// Human-readable table
    Pretty,
    /// Parquet file
    Parquet,
}
