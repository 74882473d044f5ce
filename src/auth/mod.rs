//! Authentication module
//!
//! Supports: API Key, Basic, Bearer, Custom Headers
//!
//! Catalogs declare an `AuthConfig`; the engine renders it against the data
//! source values and applies it through a `StaticSigner`.

mod signer;
mod types;

pub use signer::StaticSigner;
pub use types::{AuthConfig, Location};
