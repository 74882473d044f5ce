//! Request execution seams
//!
//! The engine never talks to the network directly: requests go through a
//! [`RequestSigner`] and a [`RequestExecutor`], bundled in a [`Transport`].

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::types::Method;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName};
use std::sync::Arc;
use tracing::debug;

/// Longest error body kept in transport errors
const MAX_ERROR_BODY: usize = 512;

// ============================================================================
// Request / Response
// ============================================================================

/// A fully built outgoing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL including the query string
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Create a request without headers or body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(key, value);
        self
    }

    /// Set a header, replacing an existing one with the same name
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(existing) => existing.1 = value,
            None => self.headers.push((key, value)),
        }
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Append a query-string parameter
    pub fn add_query(&mut self, key: &str, value: &str) -> Result<()> {
        let mut url = url::Url::parse(&self.url)?;
        url.query_pairs_mut().append_pair(key, value);
        self.url = url.to_string();
        Ok(())
    }

    /// Get the first value of a query-string parameter
    pub fn query_param(&self, key: &str) -> Option<String> {
        let url = url::Url::parse(&self.url).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

/// A response as handed to the engine
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Final URL of the request
    pub url: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    /// Create a 200 response with a body
    pub fn ok(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            url: url.into(),
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(key.as_bytes()), value.parse()) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Check for a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Sends requests
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Execute a request and return the response, whatever its status
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse>;
}

/// Applies credentials to outgoing requests
#[async_trait]
pub trait RequestSigner: Send + Sync {
    /// Add credentials to the request
    async fn sign(&self, request: &mut HttpRequest) -> Result<()>;
}

/// Signer that leaves requests untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSigner;

#[async_trait]
impl RequestSigner for NoSigner {
    async fn sign(&self, _request: &mut HttpRequest) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Executor, signer and connector-wide request settings
#[derive(Clone)]
pub struct Transport {
    executor: Arc<dyn RequestExecutor>,
    signer: Arc<dyn RequestSigner>,
    base_url: String,
    headers: Vec<(String, String)>,
}

impl Transport {
    /// Create a transport without credentials
    pub fn new(executor: Arc<dyn RequestExecutor>, base_url: impl Into<String>) -> Self {
        Self {
            executor,
            signer: Arc::new(NoSigner),
            base_url: base_url.into(),
            headers: Vec::new(),
        }
    }

    /// Set the signer
    #[must_use]
    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = signer;
        self
    }

    /// Add a header sent with every request
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Base URL endpoint suffixes are joined to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sign and send a request, failing on non-2xx responses
    ///
    /// The request is raced against `cancel`; a cancelled request yields
    /// [`Error::Cancelled`].
    pub async fn send(&self, mut request: HttpRequest, cancel: &CancelToken) -> Result<RawResponse> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        for (key, value) in &self.headers {
            if request.header(key).is_none() {
                request.headers.push((key.clone(), value.clone()));
            }
        }
        self.signer.sign(&mut request).await?;

        debug!(method = %request.method, url = %request.url, "Sending request");
        let url = request.url.clone();

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            response = self.executor.execute(request) => response?,
        };

        if !response.is_success() {
            return Err(Error::http_status(
                response.status,
                url,
                truncate(&response.body, MAX_ERROR_BODY),
            ));
        }

        debug!(status = response.status, bytes = response.body.len(), "Response received");
        Ok(response)
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers.len())
            .finish_non_exhaustive()
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
