//! CLI runner - executes commands

use crate::cancel::CancelHandle;
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_data_source, DataSourceConfig};
use crate::connector::{endpoint_summaries, CatalogConnector, Connector, ConnectorSummary};
use crate::error::{Error, Result};
use crate::query::{LookupRequest, QueryRequest};
use crate::registry::{ConnectorCatalog, Registry};
use crate::table::{write_table_to_parquet, Table};
use crate::types::OptionStringExt;
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check().await,
            Commands::Query {
                endpoint,
                params,
                extra,
                lookups,
                all_lookups,
                json_path,
                expand_arrays,
                top_level_only,
                strict_path,
                request,
                output,
            } => {
                let request = match request {
                    Some(path) => load_query_request(path)?,
                    None => QueryRequest {
                        endpoint: endpoint.clone().ok_or_else(|| {
                            Error::config("Endpoint not specified (or use --request)")
                        })?,
                        parameters: parse_pairs(params)?.into_iter().collect(),
                        additional_parameters: parse_pairs(extra)?.into_iter().collect(),
                        json_path: json_path.clone().none_if_empty(),
                        expand_arrays: expand_arrays.then_some(true),
                        top_level_only: top_level_only.then_some(true),
                        leaf_to_null: strict_path.then_some(false),
                        lookups: lookup_requests(lookups),
                        all_lookups: *all_lookups,
                    },
                };
                self.query(&request, output.as_deref()).await
            }
            Commands::Validate => self.validate(),
            Commands::Endpoints => self.endpoints(),
            Commands::List => self.list_connectors(),
            Commands::Serve { port } => {
                let config = crate::cli::ServerConfig {
                    catalogs_dir: self.cli.catalogs_dir.clone(),
                };
                crate::cli::serve(config, *port).await
            }
        }
    }

    /// Built-in catalogs plus any from `--catalogs-dir`
    fn registry(&self) -> Result<Registry> {
        let mut registry = Registry::with_builtins()?;
        if let Some(dir) = &self.cli.catalogs_dir {
            registry.load_dir(dir)?;
        }
        Ok(registry)
    }

    /// Assemble the data source from the file and command-line overrides
    fn data_source(&self) -> Result<DataSourceConfig> {
        let mut source = match (&self.cli.config, &self.cli.connector) {
            (Some(path), _) => load_data_source(path)?,
            (None, Some(connector)) => DataSourceConfig::new(connector.as_str()),
            (None, None) => {
                return Err(Error::config(
                    "Connector not specified (use -c or a data source file with -C)",
                ))
            }
        };

        if let Some(connector) = &self.cli.connector {
            source.connector.clone_from(connector);
        }
        if let Some(json) = &self.cli.config_json {
            source.config = serde_json::from_str(json)
                .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        }
        if let Some(base_url) = &self.cli.base_url {
            source.base_url = Some(base_url.clone());
        }
        Ok(source)
    }

    fn catalog(&self) -> Result<Arc<ConnectorCatalog>> {
        let name = match &self.cli.connector {
            Some(name) => name.clone(),
            None => self.data_source()?.connector,
        };
        self.registry()?.resolve(&name)
    }

    /// Build the connector; Ctrl-C cancels whatever it is running
    fn connector(&self) -> Result<CatalogConnector> {
        let source = self.data_source()?;
        let catalog = self.registry()?.resolve(&source.connector)?;

        let (handle, token) = CancelHandle::new();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling");
                handle.cancel();
            }
        });

        Ok(CatalogConnector::new(source.engine(catalog)?.with_cancel(token)))
    }

    /// Check connection
    async fn check(&self) -> Result<()> {
        let connector = self.connector()?;
        info!(connector = %connector.catalog().name, "Checking connection");

        let result = connector.test_connection().await?;
        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": {
                "status": if result.success { "SUCCEEDED" } else { "FAILED" },
                "message": result.message.unwrap_or_else(|| "Connection successful".to_string())
            }
        }));
        Ok(())
    }

    /// Run a query
    async fn query(&self, request: &QueryRequest, output: Option<&Path>) -> Result<()> {
        let connector = self.connector()?;
        let start = Instant::now();

        let table = connector.run_request(request).await?;
        let stats = connector.stats();
        info!(
            endpoint = %request.endpoint,
            rows = table.row_count(),
            queries = stats.queries_run,
            pages = stats.pages_fetched,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query finished"
        );

        match (self.cli.format, output) {
            (OutputFormat::Parquet, Some(path)) => {
                let rows = write_table_to_parquet(path, &table, None)?;
                self.output_message(&json!({
                    "type": "OUTPUT",
                    "path": path.display().to_string(),
                    "rows": rows
                }));
            }
            (OutputFormat::Parquet, None) => {
                return Err(Error::config("Parquet output needs a file (use -o)"));
            }
            (format, Some(path)) => {
                fs::write(path, render_table(&table, format))?;
                info!(path = %path.display(), "Wrote output");
            }
            (format, None) => print!("{}", render_table(&table, format)),
        }
        Ok(())
    }

    /// Validate catalog
    fn validate(&self) -> Result<()> {
        let catalog = self.catalog()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Catalog '{}' v{} is valid with {} endpoints",
                    catalog.name,
                    catalog.version,
                    catalog.endpoints.len()
                )
            }
        }));

        Ok(())
    }

    /// List endpoints
    fn endpoints(&self) -> Result<()> {
        let catalog = self.catalog()?;

        self.output_message(&json!({
            "type": "ENDPOINTS",
            "connector": catalog.name,
            "endpoints": endpoint_summaries(&catalog)
        }));

        Ok(())
    }

    /// List built-in connectors
    fn list_connectors(&self) -> Result<()> {
        let registry = self.registry()?;
        let connectors: Vec<ConnectorSummary> = registry
            .iter()
            .map(|catalog| ConnectorSummary::from(catalog.as_ref()))
            .collect();

        self.output_message(&json!({
            "type": "CONNECTORS",
            "connectors": connectors
        }));

        Ok(())
    }

    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json | OutputFormat::Parquet => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

fn load_query_request(path: &Path) -> Result<QueryRequest> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!("Failed to read query request '{}': {e}", path.display()))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| Error::config(format!("Invalid query request JSON: {e}")))
}

/// Split `NAME=VALUE` arguments
pub(crate) fn parse_pairs(args: &[String]) -> Result<Vec<(String, String)>> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(name, value)| (name.trim().to_string(), value.to_string()))
                .filter(|(name, _)| !name.is_empty())
                .ok_or_else(|| Error::config(format!("Expected NAME=VALUE, got '{arg}'")))
        })
        .collect()
}

/// Turn `A/B` lookup paths into a tree of lookup requests
///
/// Paths sharing a prefix share the lookup: `A/B` and `A/C` give one lookup
/// into `A` with two nested lookups.
pub(crate) fn lookup_requests(paths: &[String]) -> Vec<LookupRequest> {
    let mut roots: Vec<LookupRequest> = Vec::new();
    for path in paths {
        let mut level = &mut roots;
        for name in path.split('/').map(str::trim).filter(|n| !n.is_empty()) {
            let index = match level.iter().position(|l| l.endpoint == name) {
                Some(index) => index,
                None => {
                    level.push(LookupRequest::new(name));
                    level.len() - 1
                }
            };
            level = &mut level[index].lookups;
        }
    }
    roots
}

// ============================================================================
// Table rendering
// ============================================================================

/// Render a table as JSON lines or an aligned text grid
pub(crate) fn render_table(table: &Table, format: OutputFormat) -> String {
    match format {
        OutputFormat::Pretty => render_pretty(table),
        OutputFormat::Json | OutputFormat::Parquet => table
            .to_json_records()
            .iter()
            .map(|record| format!("{record}\n"))
            .collect(),
    }
}

fn render_pretty(table: &Table) -> String {
    let grid = table.to_grid();
    let mut widths = vec![0; table.column_count()];
    for row in &grid {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |row: &[String]| {
        row.iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    if let Some((header, rows)) = grid.split_first() {
        let _ = writeln!(out, "{}", line(header));
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let _ = writeln!(out, "{}", rule.join("-+-"));
        for row in rows {
            let _ = writeln!(out, "{}", line(row));
        }
    }
    let _ = writeln!(out, "({} rows)", table.row_count());
    out
}
