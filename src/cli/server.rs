//! HTTP server mode for REST API access to connector operations

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::DataSourceConfig;
use crate::connector::{endpoint_summaries, CatalogConnector, Connector, ConnectorSummary};
use crate::error::{Error, Result};
use crate::query::QueryRequest;
use crate::registry::Registry;

/// Server configuration
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Extra directory of catalog files, on top of the built-ins
    pub catalogs_dir: Option<PathBuf>,
}

/// App state shared across handlers
struct AppState {
    registry: Registry,
}

/// Request body for the query endpoint
#[derive(Debug, Deserialize)]
struct QueryBody {
    /// Connector, template values and HTTP settings
    #[serde(flatten)]
    source: DataSourceConfig,
    /// The query to run
    query: QueryRequest,
}

/// Response wrapper
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Map an error to a status and error body
fn error_response(error: &Error) -> Response {
    let status = match error {
        Error::Config { .. }
        | Error::MissingParameter { .. }
        | Error::UndefinedEndpoint { .. }
        | Error::UndefinedVariable { .. }
        | Error::Template { .. } => StatusCode::BAD_REQUEST,
        Error::Endpoint { .. } | Error::HttpStatus { .. } | Error::Http(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::<()>::error(error.to_string()))).into_response()
}

/// Build the router
pub fn router(config: &ServerConfig) -> Result<Router> {
    let mut registry = Registry::with_builtins()?;
    if let Some(dir) = &config.catalogs_dir {
        registry.load_dir(dir)?;
    }
    let state = AppState { registry };

    // Build CORS layer - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/health", get(health))
        .route("/connectors", get(list_connectors))
        .route("/connectors/:name/endpoints", get(get_endpoints))
        .route("/check", post(check_connection))
        .route("/query", post(run_query))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state)))
}

/// Start the HTTP server
pub async fn serve(config: ServerConfig, port: u16) -> Result<()> {
    let app = router(&config)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to port {port}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    Ok(())
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// List registered connectors
async fn list_connectors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let connectors: Vec<ConnectorSummary> = state
        .registry
        .iter()
        .map(|catalog| ConnectorSummary::from(catalog.as_ref()))
        .collect();

    Json(ApiResponse::success(json!({
        "type": "CONNECTORS",
        "connectors": connectors
    })))
}

/// List a connector's endpoints
async fn get_endpoints(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    match state.registry.get(&name) {
        Ok(catalog) => Json(ApiResponse::success(json!({
            "type": "ENDPOINTS",
            "connector": catalog.name,
            "endpoints": endpoint_summaries(&catalog)
        })))
        .into_response(),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error(format!("Connector not found: {e}"))),
        )
            .into_response(),
    }
}

/// Check connection to API
async fn check_connection(
    State(state): State<Arc<AppState>>,
    Json(source): Json<DataSourceConfig>,
) -> Response {
    let connector = match CatalogConnector::from_config(&state.registry, &source) {
        Ok(connector) => connector,
        Err(e) => return error_response(&e),
    };

    match connector.test_connection().await {
        Ok(result) => Json(ApiResponse::success(json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": {
                "status": if result.success { "SUCCEEDED" } else { "FAILED" },
                "message": result.message
            }
        })))
        .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Run a query and return its table
async fn run_query(State(state): State<Arc<AppState>>, Json(body): Json<QueryBody>) -> Response {
    let connector = match CatalogConnector::from_config(&state.registry, &body.source) {
        Ok(connector) => connector,
        Err(e) => return error_response(&e),
    };

    match connector.run_request(&body.query).await {
        Ok(table) => Json(ApiResponse::success(json!({
            "type": "TABLE",
            "columns": table.columns(),
            "row_count": table.row_count(),
            "rows": table.to_json_records(),
            "stats": connector.stats()
        })))
        .into_response(),
        Err(e) => {
            tracing::warn!(endpoint = %body.query.endpoint, error = %e, "Query failed");
            error_response(&e)
        }
    }
}
