//! Static request signer
//!
//! Applies a rendered [`AuthConfig`] to every outgoing request.

use super::types::{AuthConfig, Location};
use crate::error::Result;
use crate::http::{HttpRequest, RequestSigner};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Signer for credentials that never change during a query
#[derive(Debug, Clone, Default)]
pub struct StaticSigner {
    config: AuthConfig,
}

impl StaticSigner {
    /// Create a signer from an already rendered config
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// The applied configuration
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

#[async_trait]
impl RequestSigner for StaticSigner {
    async fn sign(&self, request: &mut HttpRequest) -> Result<()> {
        match &self.config {
            AuthConfig::None => {}

            AuthConfig::ApiKey {
                key,
                value,
                location,
                prefix,
            } => {
                let val = format!("{}{}", prefix.as_deref().unwrap_or(""), value);
                match location {
                    Location::Header => request.set_header(key.as_str(), val),
                    Location::Query => request.add_query(key, &val)?,
                }
            }

            AuthConfig::Bearer { token } => {
                request.set_header("Authorization", format!("Bearer {token}"));
            }

            AuthConfig::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                request.set_header("Authorization", format!("Basic {encoded}"));
            }

            AuthConfig::CustomHeaders { headers } => {
                for (key, value) in headers {
                    request.set_header(key.as_str(), value.as_str());
                }
            }
        }
        Ok(())
    }
}
