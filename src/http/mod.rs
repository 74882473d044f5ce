//! HTTP transport module
//!
//! Request/response types, the executor and signer seams, and the default
//! reqwest-backed executor with retry, rate limiting, and backoff strategies.
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Backoff Strategies**: Constant, linear, and exponential backoff
//! - **Cancellation**: every request is raced against the query's cancel token

mod client;
mod executor;
#[cfg(test)]
pub(crate) mod mock;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder};
pub use executor::{HttpRequest, NoSigner, RawResponse, RequestExecutor, RequestSigner, Transport};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
