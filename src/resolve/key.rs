//! Lookup keys
//!
//! A lookup key names where the id for the child query comes from:
//!
//! - `""`: the entity itself (bare scalar entities, e.g. a list of ids)
//! - `$(name)`: parameter `name` of the parent query
//! - `$.a.b`: a nested field of the entity
//! - `field`: a top-level field of the entity

use crate::error::{Error, Result};
use crate::parse::{query_node, Node};
use crate::query::Query;
use crate::registry::LookupDescriptor;
use tracing::debug;

/// Parsed form of a lookup key or field-derived parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyExpr {
    Entity,
    Parameter(String),
    Path(String),
    Field(String),
}

impl KeyExpr {
    pub fn parse(key: &str) -> Self {
        let key = key.trim();
        if key.is_empty() {
            return Self::Entity;
        }
        if let Some(name) = key.strip_prefix("$(").and_then(|k| k.strip_suffix(')')) {
            return Self::Parameter(name.trim().to_string());
        }
        if key.starts_with("$.") || key.starts_with("$[") {
            return Self::Path(key.to_string());
        }
        Self::Field(key.to_string())
    }
}

/// Ids for one lookup on one entity
///
/// An empty result means the lookup is skipped for this entity: the key is
/// missing or null. A list of scalars yields one id per non-null element.
pub fn key_values(entity: &Node, lookup: &LookupDescriptor, parent: &Query) -> Result<Vec<String>> {
    let key = KeyExpr::parse(&lookup.key);

    let selected = match (entity, &key) {
        (Node::Scalar(scalar), KeyExpr::Entity) => return Ok(scalar.as_param().into_iter().collect()),
        (Node::Composite(_), KeyExpr::Parameter(name)) => {
            return Ok(parent
                .parameters()
                .get(name)
                .map(str::to_string)
                .into_iter()
                .collect())
        }
        (Node::Composite(_), KeyExpr::Path(path)) => query_node(entity, path)?,
        (Node::Composite(_), KeyExpr::Field(field)) => entity.get(field).cloned(),
        (Node::Composite(_), KeyExpr::Entity) => None,
        _ => {
            return Err(Error::lookup(
                &lookup.endpoint,
                "Only lookups on json objects are supported",
            ))
        }
    };

    match selected {
        Some(node) => node_ids(&node, lookup),
        None => {
            debug!(lookup = %lookup.endpoint, key = %lookup.key, "Lookup key not present");
            Ok(Vec::new())
        }
    }
}

fn node_ids(node: &Node, lookup: &LookupDescriptor) -> Result<Vec<String>> {
    match node {
        Node::Scalar(scalar) => Ok(scalar.as_param().into_iter().collect()),
        Node::List(items) => {
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                ids.extend(node_ids(item, lookup)?);
            }
            Ok(ids)
        }
        Node::Composite(_) => Err(Error::lookup(
            &lookup.endpoint,
            format!("key '{}' selects an object, not a value", lookup.key),
        )),
    }
}

/// Resolve the extra parameters of a lookup against one entity
///
/// `$.path` and `$(name)` values are field-derived and dropped when absent;
/// anything else is a literal.
pub fn extra_parameters(
    entity: &Node,
    lookup: &LookupDescriptor,
    parent: &Query,
) -> Result<Vec<(String, String)>> {
    let mut resolved = Vec::with_capacity(lookup.parameters.len());
    for (name, value) in &lookup.parameters {
        let value = match KeyExpr::parse(value) {
            KeyExpr::Parameter(param) => parent.parameters().get(&param).map(str::to_string),
            KeyExpr::Path(path) => match query_node(entity, &path)? {
                Some(node) => node_ids(&node, lookup)?.into_iter().next(),
                None => None,
            },
            KeyExpr::Entity | KeyExpr::Field(_) => Some(value.clone()),
        };
        match value {
            Some(value) => resolved.push((name.clone(), value)),
            None => debug!(lookup = %lookup.endpoint, parameter = %name, "Derived parameter absent"),
        }
    }
    Ok(resolved)
}
