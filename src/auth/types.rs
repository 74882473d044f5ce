//! Auth configuration types
//!
//! Catalogs declare authentication with `{{ config.x }}` templates; a data
//! source's values are interpolated with [`AuthConfig::render`] before the
//! config reaches a signer.

use crate::error::Result;
use crate::template::{render, TemplateContext};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Location for API key placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Place in HTTP header
    #[default]
    Header,
    /// Place in query parameter
    Query,
}

/// Authentication configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// API Key authentication (header or query)
    ApiKey {
        /// Header or query parameter name
        key: String,
        /// The API key value
        value: String,
        /// Where to place the API key
        #[serde(default)]
        location: Location,
        /// Prefix to add before the value (e.g., "Token ")
        #[serde(default)]
        prefix: Option<String>,
    },

    /// Bearer token authentication
    Bearer {
        /// The bearer token
        token: String,
    },

    /// HTTP Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        #[serde(default)]
        password: String,
    },

    /// Custom headers
    CustomHeaders {
        /// Headers to add to each request
        headers: IndexMap<String, String>,
    },
}

impl AuthConfig {
    /// Interpolate `{{ }}` templates in every value
    pub fn render(&self, ctx: &TemplateContext) -> Result<AuthConfig> {
        Ok(match self {
            AuthConfig::None => AuthConfig::None,
            AuthConfig::ApiKey {
                key,
                value,
                location,
                prefix,
            } => AuthConfig::ApiKey {
                key: render(key, ctx)?,
                value: render(value, ctx)?,
                location: *location,
                prefix: prefix.as_deref().map(|p| render(p, ctx)).transpose()?,
            },
            AuthConfig::Bearer { token } => AuthConfig::Bearer {
                token: render(token, ctx)?,
            },
            AuthConfig::Basic { username, password } => AuthConfig::Basic {
                username: render(username, ctx)?,
                password: render(password, ctx)?,
            },
            AuthConfig::CustomHeaders { headers } => AuthConfig::CustomHeaders {
                headers: headers
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), render(v, ctx)?)))
                    .collect::<Result<_>>()?,
            },
        })
    }

    /// Check whether requests carry no credentials
    pub fn is_none(&self) -> bool {
        matches!(self, AuthConfig::None)
    }
}
