//! Tests for the HTTP transport module

use super::mock::MockExecutor;
use super::*;
use crate::cancel::{CancelHandle, CancelToken};
use crate::error::Error;
use crate::types::{BackoffType, Method};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn quick_client(max_retries: u32) -> HttpClient {
    let config = HttpClientConfig::builder()
        .max_retries(max_retries)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .no_rate_limit()
        .build();
    HttpClient::with_config(config).unwrap()
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 3);
    assert!(config.rate_limit.is_none());
    assert!(config.user_agent.starts_with("solidafy-tabular/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .timeout(Duration::from_secs(60))
        .max_retries(5)
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(200),
            Duration::from_secs(30),
        )
        .rate_limit(RateLimiterConfig::per_second(4))
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(config.initial_backoff, Duration::from_millis(200));
    assert_eq!(config.max_backoff, Duration::from_secs(30));
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::new(4, 4)));
    assert_eq!(config.user_agent, "test-agent/1.0");

    let client = HttpClient::with_config(config).unwrap();
    assert!(client.has_rate_limiter());
}

#[test]
fn test_calculate_backoff() {
    let exponential = HttpClient::with_config(
        HttpClientConfig::builder()
            .backoff(
                BackoffType::Exponential,
                Duration::from_millis(100),
                Duration::from_millis(500),
            )
            .build(),
    )
    .unwrap();
    assert_eq!(exponential.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(exponential.calculate_backoff(2), Duration::from_millis(400));
    assert_eq!(exponential.calculate_backoff(10), Duration::from_millis(500));

    let linear = HttpClient::with_config(
        HttpClientConfig::builder()
            .backoff(
                BackoffType::Linear,
                Duration::from_millis(100),
                Duration::from_secs(10),
            )
            .build(),
    )
    .unwrap();
    assert_eq!(linear.calculate_backoff(2), Duration::from_millis(300));

    let constant = quick_client(0);
    assert_eq!(constant.calculate_backoff(5), Duration::from_millis(10));
}

#[tokio::test]
async fn test_rate_limiter_allows_burst() {
    let limiter = RateLimiter::new(&RateLimiterConfig::new(10, 5));
    for _ in 0..5 {
        assert!(limiter.try_acquire());
    }
    assert!(!limiter.try_acquire());
}

#[tokio::test]
async fn test_rate_limiter_zero_rate_is_clamped() {
    let limiter = RateLimiter::new(&RateLimiterConfig::new(0, 0));
    limiter.wait().await;
}

// ============================================================================
// Request helpers
// ============================================================================

#[test]
fn test_http_request_headers_and_query() {
    let mut request = HttpRequest::new(Method::GET, "https://api.example.com/items?a=1")
        .with_header("Accept", "application/json");
    request.set_header("accept", "text/xml");
    request.add_query("page", "2").unwrap();
    request.add_query("q", "a b").unwrap();

    assert_eq!(request.headers.len(), 1);
    assert_eq!(request.header("ACCEPT"), Some("text/xml"));
    assert_eq!(request.query_param("page"), Some("2".to_string()));
    assert_eq!(request.query_param("q"), Some("a b".to_string()));
    assert_eq!(request.query_param("a"), Some("1".to_string()));
}

#[test]
fn test_raw_response_headers_case_insensitive() {
    let response = RawResponse::ok("u", "").with_header("X-Total-Pages", "3");
    assert_eq!(response.header("x-total-pages"), Some("3"));
    assert!(response.is_success());
}

// ============================================================================
// HttpClient as executor
// ============================================================================

#[tokio::test]
async fn test_execute_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("page", "1"))
        .and(header("X-Custom", "value"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-total-pages", "4")
                .set_body_json(serde_json::json!({"users": [{"id": 1}]})),
        )
        .mount(&server)
        .await;

    let request = HttpRequest::new(Method::GET, format!("{}/api/users?page=1", server.uri()))
        .with_header("X-Custom", "value");
    let response = quick_client(0).execute(request).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.header("X-Total-Pages"), Some("4"));
    assert!(response.body.contains("users"));
    assert!(response.url.ends_with("/api/users?page=1"));
}

#[tokio::test]
async fn test_execute_post_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .and(header("content-type", "application/json"))
        .and(body_string(r#"{"q":"x"}"#))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let mut request = HttpRequest::new(Method::POST, format!("{}/api/search", server.uri()));
    request.body = Some(r#"{"q":"x"}"#.to_string());
    let response = quick_client(0).execute(request).await.unwrap();

    assert_eq!(response.status, 201);
}

#[tokio::test]
async fn test_execute_retries_on_500() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let request = HttpRequest::new(Method::GET, format!("{}/api/flaky", server.uri()));
    let response = quick_client(3).execute(request).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "ok");
}

#[tokio::test]
async fn test_execute_retries_on_429() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/limited"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let request = HttpRequest::new(Method::GET, format!("{}/api/limited", server.uri()));
    let response = quick_client(2).execute(request).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_execute_returns_final_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/always-fail"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Server error"))
        .expect(3)
        .mount(&server)
        .await;

    let request = HttpRequest::new(Method::GET, format!("{}/api/always-fail", server.uri()));
    let response = quick_client(2).execute(request).await.unwrap();

    assert_eq!(response.status, 500);
    assert_eq!(response.body, "Server error");
}

// ============================================================================
// Transport
// ============================================================================

struct HeaderSigner;

#[async_trait]
impl RequestSigner for HeaderSigner {
    async fn sign(&self, request: &mut HttpRequest) -> crate::Result<()> {
        request.set_header("Authorization", "Bearer secret");
        Ok(())
    }
}

#[tokio::test]
async fn test_transport_adds_headers_and_signs() {
    let executor = Arc::new(MockExecutor::new(|req| Ok(RawResponse::ok(&req.url, "{}"))));
    let transport = Transport::new(executor.clone(), "https://api.example.com")
        .with_header("Accept", "application/json")
        .with_signer(Arc::new(HeaderSigner));

    let request = HttpRequest::new(Method::GET, "https://api.example.com/x");
    transport.send(request, &CancelToken::never()).await.unwrap();

    let seen = executor.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].header("accept"), Some("application/json"));
    assert_eq!(seen[0].header("authorization"), Some("Bearer secret"));
}

#[tokio::test]
async fn test_transport_rejects_non_success() {
    let executor = Arc::new(MockExecutor::new(|req| {
        Ok(RawResponse {
            status: 404,
            body: "missing".to_string(),
            ..RawResponse::ok(&req.url, "")
        })
    }));
    let transport = Transport::new(executor, "https://api.example.com");

    let err = transport
        .send(
            HttpRequest::new(Method::GET, "https://api.example.com/nope"),
            &CancelToken::never(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "HTTP 404 from https://api.example.com/nope: missing"
    );
}

#[tokio::test]
async fn test_transport_honours_cancellation() {
    let executor = Arc::new(MockExecutor::new(|req| Ok(RawResponse::ok(&req.url, ""))));
    let transport = Transport::new(executor.clone(), "https://api.example.com");
    let (handle, token) = CancelHandle::new();
    handle.cancel();

    let err = transport
        .send(HttpRequest::new(Method::GET, "https://api.example.com/"), &token)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(executor.requests().is_empty());
}
