//! Normalized response tree
//!
//! Every response body, JSON or XML, is parsed into the same tree shape so the
//! resolver and assembler never care where the data came from.

use crate::types::ScalarType;
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

/// Fields of a composite node, in document order
pub type Fields = IndexMap<String, Node>;

// ============================================================================
// Scalar
// ============================================================================

/// A leaf value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    /// Narrow untyped text into the most specific scalar
    ///
    /// A successful integer or float parse yields a number, the exact strings
    /// `true` and `false` yield a boolean, everything else stays a string.
    pub fn narrow(text: &str) -> Self {
        if let Ok(n) = text.parse::<i64>() {
            return Scalar::Number(n.into());
        }

        if let Ok(f) = text.parse::<f64>() {
            if let Some(n) = Number::from_f64(f) {
                return Scalar::Number(n);
            }
        }

        match text {
            "true" => Scalar::Bool(true),
            "false" => Scalar::Bool(false),
            _ => Scalar::String(text.to_string()),
        }
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Type this value would give an untyped column
    pub fn inferred_type(&self) -> Option<ScalarType> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(_) => Some(ScalarType::Boolean),
            Scalar::Number(n) if n.is_f64() => Some(ScalarType::Double),
            Scalar::Number(_) => Some(ScalarType::Integer),
            Scalar::String(_) => Some(ScalarType::String),
        }
    }

    /// Render as a request parameter value; null has no rendering
    pub fn as_param(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(b) => Some(b.to_string()),
            Scalar::Number(n) => Some(n.to_string()),
            Scalar::String(s) => Some(s.clone()),
        }
    }

    /// Reinterpret this value as the declared column type
    ///
    /// Values that do not fit the declared type are kept as text.
    pub fn coerce(&self, ty: ScalarType) -> Scalar {
        let text = match self {
            Scalar::Null => return Scalar::Null,
            Scalar::String(s) => s.trim(),
            other => return other.coerce_typed(ty),
        };

        match ty {
            ScalarType::Integer => text
                .parse::<i64>()
                .map(|n| Scalar::Number(n.into()))
                .unwrap_or_else(|_| self.clone()),
            ScalarType::Double => text
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map_or_else(|| self.clone(), Scalar::Number),
            ScalarType::Boolean => match text {
                "true" | "1" => Scalar::Bool(true),
                "false" | "0" => Scalar::Bool(false),
                _ => self.clone(),
            },
            ScalarType::String | ScalarType::Date | ScalarType::DateTime => self.clone(),
        }
    }

    fn coerce_typed(&self, ty: ScalarType) -> Scalar {
        match (ty, self) {
            (ScalarType::String | ScalarType::Date | ScalarType::DateTime, _) => {
                self.as_param().map_or(Scalar::Null, Scalar::String)
            }
            (ScalarType::Double, Scalar::Number(n)) => n
                .as_f64()
                .and_then(Number::from_f64)
                .map_or_else(|| self.clone(), Scalar::Number),
            _ => self.clone(),
        }
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => Value::Number(n.clone()),
            Scalar::String(s) => Value::String(s.clone()),
        }
    }
}

// ============================================================================
// Node
// ============================================================================

/// A node of the normalized response tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Named fields in insertion order
    Composite(Fields),
    /// Ordered elements
    List(Vec<Node>),
    /// Leaf
    Scalar(Scalar),
}

impl Node {
    /// The null leaf
    pub fn null() -> Self {
        Node::Scalar(Scalar::Null)
    }

    /// Leaf holding a string
    pub fn string(value: impl Into<String>) -> Self {
        Node::Scalar(Scalar::String(value.into()))
    }

    /// Check for a null leaf
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Scalar(Scalar::Null))
    }

    /// Get a direct child of a composite node
    pub fn get(&self, name: &str) -> Option<&Node> {
        match self {
            Node::Composite(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Borrow the scalar of a leaf node
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the fields of a composite node
    pub fn as_composite(&self) -> Option<&Fields> {
        match self {
            Node::Composite(fields) => Some(fields),
            _ => None,
        }
    }

    /// Convert a JSON value, keeping object key order
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Node::null(),
            Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Node::Scalar(Scalar::Number(n)),
            Value::String(s) => Node::Scalar(Scalar::String(s)),
            Value::Array(items) => Node::List(items.into_iter().map(Node::from_json).collect()),
            Value::Object(map) => Node::Composite(
                map.into_iter()
                    .map(|(k, v)| (k, Node::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert back to a JSON value
    pub fn to_json(&self) -> Value {
        match self {
            Node::Scalar(s) => s.to_json(),
            Node::List(items) => Value::Array(items.iter().map(Node::to_json).collect()),
            Node::Composite(fields) => {
                let mut map = Map::new();
                for (k, v) in fields {
                    map.insert(k.clone(), v.to_json());
                }
                Value::Object(map)
            }
        }
    }

    /// Flatten into the entities a query result stands for
    ///
    /// A list contributes each element, anything else is a single entity.
    pub fn into_entities(self) -> Vec<Node> {
        match self {
            Node::List(items) => items,
            other => vec![other],
        }
    }
}

/// Add a child under `name`, promoting to a list on repeated names
///
/// The first occurrence is stored as-is. A second occurrence turns the field
/// into a list of both; further occurrences append.
pub fn insert_repeated(fields: &mut Fields, name: String, node: Node) {
    match fields.get_mut(&name) {
        None => {
            fields.insert(name, node);
        }
        Some(Node::List(items)) => items.push(node),
        Some(existing) => {
            let first = std::mem::replace(existing, Node::null());
            *existing = Node::List(vec![first, node]);
        }
    }
}
