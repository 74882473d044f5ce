//! Error types for Solidafy Tabular
//!
//! This module defines the error hierarchy for the whole runtime.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Errors fall into four groups: transport (the request never produced a
//! usable 2xx body), parse (the body or schema could not be read),
//! resolution (a lookup could not be built), and configuration. Conditions
//! that are merely skippable (a null lookup key, a missing pagination signal)
//! never surface as errors.

use thiserror::Error;

/// The main error type for Solidafy Tabular
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required parameter '{parameter}' for endpoint '{endpoint}'")]
    MissingParameter { endpoint: String, parameter: String },

    #[error("Endpoint '{endpoint}' is not defined by connector '{connector}'")]
    UndefinedEndpoint { connector: String, endpoint: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request to endpoint '{endpoint}' failed: {source}")]
    Endpoint {
        endpoint: String,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // Parse Errors
    // ============================================================================
    #[error("JSONPath error: {message}")]
    JsonPath { message: String },

    #[error("Failed to extract records from path '{path}': {message}")]
    RecordExtraction { path: String, message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("XML parsing error: {message}")]
    XmlParse { message: String },

    #[error("XMLSchema is missing definition for {path}")]
    SchemaMismatch { path: String },

    // ============================================================================
    // Resolution Errors
    // ============================================================================
    #[error("Lookup '{lookup}' failed: {message}")]
    Lookup { lookup: String, message: String },

    #[error("Query cancelled")]
    Cancelled,

    // ============================================================================
    // Output Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // Connector Errors
    // ============================================================================
    #[error("Connection check failed: {message}")]
    ConnectionCheck { message: String },

    // ============================================================================
    // Template Errors
    // ============================================================================
    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing parameter error
    pub fn missing_parameter(endpoint: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::MissingParameter {
            endpoint: endpoint.into(),
            parameter: parameter.into(),
        }
    }

    /// Create an undefined endpoint error
    pub fn undefined_endpoint(connector: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::UndefinedEndpoint {
            connector: connector.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    /// Wrap an error with the endpoint that produced it
    pub fn at_endpoint(endpoint: impl Into<String>, source: Error) -> Self {
        match source {
            // Already attributed further down the lookup chain.
            e @ (Error::Endpoint { .. } | Error::Cancelled) => e,
            e => Self::Endpoint {
                endpoint: endpoint.into(),
                source: Box::new(e),
            },
        }
    }

    /// Create a JSONPath error
    pub fn json_path(message: impl Into<String>) -> Self {
        Self::JsonPath {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an XML parse error
    pub fn xml(message: impl Into<String>) -> Self {
        Self::XmlParse {
            message: message.into(),
        }
    }

    /// Create a schema mismatch error for `<parent>/<child>`
    pub fn schema_mismatch(parent: &str, child: &str) -> Self {
        Self::SchemaMismatch {
            path: format!("{parent}/{child}"),
        }
    }

    /// Create a lookup resolution error
    pub fn lookup(lookup: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Lookup {
            lookup: lookup.into(),
            message: message.into(),
        }
    }

    /// Create a template error
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            Error::Endpoint { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Check if this error came from cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for Solidafy Tabular
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
