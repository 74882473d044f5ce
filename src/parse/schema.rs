//! Schema-aware XML parsing and the per-parse type map

use super::node::{insert_repeated, Fields, Node, Scalar};
use super::xml::{read_document, Element};
use crate::error::{Error, Result};
use crate::types::ScalarType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Schema definition
// ============================================================================

/// Declared structure of an XML response
///
/// An element without children is primitive and carries a type name
/// (`xs:int`, `decimal`, `string`, ...). Composite elements list their
/// children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaElement {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SchemaElement>,
}

impl SchemaElement {
    /// Create a primitive element
    pub fn primitive(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
            children: Vec::new(),
        }
    }

    /// Create a composite element
    pub fn composite(name: impl Into<String>, children: Vec<SchemaElement>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            children,
        }
    }

    /// Check whether this element holds a value rather than children
    pub fn is_primitive(&self) -> bool {
        self.children.is_empty()
    }

    /// Declared scalar type of a primitive element
    pub fn scalar_type(&self) -> ScalarType {
        self.type_name
            .as_deref()
            .map_or(ScalarType::String, ScalarType::from_xsd)
    }
}

// ============================================================================
// Type map
// ============================================================================

/// Declared types discovered during one parse, keyed by tag path from the root
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeMap {
    entries: IndexMap<Vec<String>, ScalarType>,
}

impl TypeMap {
    /// Create an empty type map
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type unless the path already has one
    pub fn insert_if_absent(&mut self, path: Vec<String>, ty: ScalarType) {
        self.entries.entry(path).or_insert(ty);
    }

    /// Exact lookup
    pub fn get(&self, path: &[String]) -> Option<ScalarType> {
        self.entries.get(path).copied()
    }

    /// Fold another map in, keeping existing registrations
    pub fn merge(&mut self, other: TypeMap) {
        for (path, ty) in other.entries {
            self.insert_if_absent(path, ty);
        }
    }

    /// Number of registered paths
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check for no registrations
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate registrations in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<String>, &ScalarType)> {
        self.entries.iter()
    }
}

// ============================================================================
// Schema-aware parse
// ============================================================================

/// Parse state for one schema-aware walk
struct TypedWalk {
    types: TypeMap,
}

impl TypedWalk {
    // Children are matched by name, so a tag path identifies exactly one
    // schema element and a registered path is never registered again.
    fn register(&mut self, schema: &SchemaElement, path: &[String]) {
        if self.types.get(path).is_none() {
            self.types.insert_if_absent(path.to_vec(), schema.scalar_type());
        }
    }

    fn walk(
        &mut self,
        element: &Element,
        schema: &SchemaElement,
        path: &mut Vec<String>,
    ) -> Result<Node> {
        if schema.is_primitive() {
            self.register(schema, path);
            if element.text.is_empty() {
                return Ok(Node::null());
            }
            return Ok(Node::Scalar(Scalar::String(element.text.clone())));
        }

        let mut fields = Fields::new();
        for (key, value) in &element.attributes {
            fields.insert(format!("@{key}"), Node::string(value.clone()));
        }

        for child in &element.children {
            let child_schema = schema
                .children
                .iter()
                .find(|c| c.name == child.name)
                .ok_or_else(|| Error::schema_mismatch(&path.join("/"), &child.name))?;

            path.push(child.name.clone());
            let node = self.walk(child, child_schema, path)?;
            path.pop();

            insert_repeated(&mut fields, child.name.clone(), node);
        }

        Ok(Node::Composite(fields))
    }
}

/// Parse a document against a declared schema
///
/// Returns the tree (rooted like [`super::xml::parse_untyped`]) and the types
/// registered for primitive elements along the way.
pub fn parse_typed(xml: &str, schema: &SchemaElement) -> Result<(Node, TypeMap)> {
    let root = read_document(xml)?;
    if root.name != schema.name {
        return Err(Error::schema_mismatch("", &root.name));
    }

    let mut walk = TypedWalk {
        types: TypeMap::new(),
    };
    let mut path = vec![root.name.clone()];
    let node = walk.walk(&root, schema, &mut path)?;

    let mut fields = Fields::new();
    fields.insert(root.name.clone(), node);
    Ok((Node::Composite(fields), walk.types))
}
