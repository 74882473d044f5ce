//! Response body → entities

use super::node::Node;
use super::path::{field_names, query_json, query_node};
use super::schema::{parse_typed, SchemaElement, TypeMap};
use super::xml::parse_untyped;
use crate::error::{Error, Result};
use crate::types::DataFormat;
use serde_json::Value;

/// How a response body is parsed and which part of it holds the entities
#[derive(Debug, Clone, Default)]
pub struct ParseOptions<'a> {
    /// Body format
    pub format: DataFormat,
    /// Path query selecting the entity or entities
    pub json_path: Option<&'a str>,
    /// Yield nothing instead of failing when the path matches nothing
    pub leaf_to_null: bool,
    /// Declared XML schema
    pub schema: Option<&'a SchemaElement>,
}

impl ParseOptions<'_> {
    /// Element path the entities are selected from, empty for the whole body
    pub fn entity_path(&self) -> Vec<String> {
        self.json_path.map(field_names).unwrap_or_default()
    }
}

/// Entities of one parsed page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    pub entities: Vec<Node>,
    pub types: TypeMap,
    /// Tag path of the entities from the document root
    pub entity_path: Vec<String>,
}

/// Parse a whole body into a tree, with no path applied
pub fn parse_document(
    body: &str,
    format: DataFormat,
    schema: Option<&SchemaElement>,
) -> Result<(Node, TypeMap)> {
    match format {
        DataFormat::Json => {
            let value: Value = serde_json::from_str(body)
                .map_err(|e| Error::decode(format!("Failed to parse JSON: {e}")))?;
            Ok((Node::from_json(value), TypeMap::new()))
        }
        DataFormat::Xml => match schema {
            Some(schema) => parse_typed(body, schema),
            None => Ok((parse_untyped(body)?, TypeMap::new())),
        },
    }
}

/// Parse a response body and extract its entities
pub fn parse_response(body: &str, options: &ParseOptions<'_>) -> Result<ParsedPage> {
    if body.trim().is_empty() {
        return Ok(ParsedPage {
            entity_path: options.entity_path(),
            ..Default::default()
        });
    }

    let (selected, types) = match (options.format, options.json_path) {
        // JSON keeps the raw value so full JSONPath expressions stay available
        (DataFormat::Json, Some(path)) => {
            let value: Value = serde_json::from_str(body)
                .map_err(|e| Error::decode(format!("Failed to parse JSON: {e}")))?;
            (query_json(value, path)?, TypeMap::new())
        }
        (format, path) => {
            let (document, types) = parse_document(body, format, options.schema)?;
            match path {
                Some(path) => (query_node(&document, path)?, types),
                None => (Some(document), types),
            }
        }
    };

    let entities = match selected {
        Some(node) if node.is_null() => Vec::new(),
        Some(node) => node.into_entities(),
        None if options.leaf_to_null => Vec::new(),
        None => {
            return Err(Error::RecordExtraction {
                path: options.json_path.unwrap_or("$").to_string(),
                message: "path matched nothing".to_string(),
            })
        }
    };

    Ok(ParsedPage {
        entities,
        types,
        entity_path: options.entity_path(),
    })
}
