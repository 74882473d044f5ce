//! Lookup resolver
//!
//! Supports: entity keys, nested field keys, inherited parameter keys,
//! id lists, nested lookups
//!
//! # Overview
//!
//! Joins related entities onto each parent entity. The resolver derives a
//! child query per lookup and per entity and hands it back to a
//! [`QueryRunner`], which drives pagination, parsing and further lookups.

mod key;
mod resolver;
mod types;

pub use key::{extra_parameters, key_values, KeyExpr};
pub use resolver::{child_query, LookupResolver, QueryRunner, DEFAULT_LOOKUP_CONCURRENCY};
pub use types::{ResolvedLookup, ResolvedRow, ResolvedSet};

#[cfg(test)]
mod tests;
