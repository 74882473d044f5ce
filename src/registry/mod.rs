//! Descriptor registry
//!
//! Load connector catalogs from YAML.
//!
//! # Overview
//!
//! The registry module provides:
//! - `ConnectorCatalog` - the named endpoints of one connector type
//! - `EndpointDescriptor` / `LookupDescriptor` - endpoint and join metadata
//! - YAML parsing with validation
//! - `Registry` - the loaded catalogs, shared read-only

mod parser;
mod store;
mod types;

pub use parser::{load_catalog, load_catalog_from_str, validate_catalog};
pub use store::Registry;
pub use types::{
    ConnectorCatalog, EndpointDescriptor, LookupDescriptor, ParamLocation, ParameterDescriptor,
};
