//! Path queries over parsed responses
//!
//! Simple paths (`data.items`, `$.data[0]`, `orders/order`, `items[-1]`,
//! `items[*].id`) are evaluated directly on the [`Node`] tree. JSON bodies may
//! also use full JSONPath expressions (`$..id`, `$.items[?(@.active)]`), which
//! are handed to `jsonpath-rust`.

use super::node::Node;
use crate::error::{Error, Result};
use serde_json::Value;

/// One step of a simple path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Named child; applied to every element when the current node is a list
    Field(String),
    /// Position in a list, negative counts from the end
    Index(i64),
    /// Every element of a list
    Wildcard,
}

/// Parse a simple path into segments
///
/// Both `.` and `/` separate fields; a leading `$` or `/` is ignored.
pub fn parse_path(path: &str) -> Result<Vec<Segment>> {
    let trimmed = path.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);

    let mut segments = Vec::new();
    for part in trimmed.split(['.', '/']) {
        if part.is_empty() {
            continue;
        }

        let (name, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };

        if name == "*" {
            segments.push(Segment::Wildcard);
        } else if !name.is_empty() {
            segments.push(Segment::Field(name.to_string()));
        }

        while let Some(stripped) = rest.strip_prefix('[') {
            let end = stripped
                .find(']')
                .ok_or_else(|| Error::json_path(format!("Unclosed '[' in path '{path}'")))?;
            let index = stripped[..end].trim();
            if index == "*" {
                segments.push(Segment::Wildcard);
            } else {
                let index = index.trim_matches(['\'', '"']);
                match index.parse::<i64>() {
                    Ok(i) => segments.push(Segment::Index(i)),
                    Err(_) => segments.push(Segment::Field(index.to_string())),
                }
            }
            rest = &stripped[end + 1..];
        }
    }

    Ok(segments)
}

/// Check whether a path needs the full JSONPath engine
pub fn is_complex(path: &str) -> bool {
    path.contains("..") || path.contains("?(") || path.contains(':') || path.contains(',')
}

/// Evaluate a simple path against a node
///
/// Returns `None` when nothing matches. A path that fans out over a list
/// (wildcard, or a field applied to a list) returns a list of the matches.
pub fn select(root: &Node, segments: &[Segment]) -> Option<Node> {
    let mut current: Vec<&Node> = vec![root];
    let mut multi = false;

    for segment in segments {
        let mut next = Vec::new();
        for node in current {
            match (segment, node) {
                (Segment::Field(name), Node::Composite(fields)) => {
                    if let Some(child) = fields.get(name) {
                        next.push(child);
                    }
                }
                (Segment::Field(name), Node::List(items)) => {
                    multi = true;
                    next.extend(items.iter().filter_map(|item| item.get(name)));
                }
                (Segment::Index(index), Node::List(items)) => {
                    if let Some(item) = resolve_index(items, *index) {
                        next.push(item);
                    }
                }
                (Segment::Wildcard, Node::List(items)) => {
                    multi = true;
                    next.extend(items.iter());
                }
                (Segment::Wildcard, Node::Composite(fields)) => {
                    multi = true;
                    next.extend(fields.values());
                }
                _ => {}
            }
        }
        current = next;
    }

    if multi {
        if current.is_empty() {
            None
        } else {
            Some(Node::List(current.into_iter().cloned().collect()))
        }
    } else {
        current.first().map(|n| (*n).clone())
    }
}

#[allow(clippy::cast_possible_wrap)]
fn resolve_index(items: &[Node], index: i64) -> Option<&Node> {
    let idx = if index < 0 {
        items.len() as i64 + index
    } else {
        index
    };
    usize::try_from(idx).ok().and_then(|i| items.get(i))
}

/// Field names of a path, dropping indexes and wildcards
///
/// Paths that fail to parse yield no fields.
pub fn field_names(path: &str) -> Vec<String> {
    parse_path(path)
        .map(|segments| {
            segments
                .into_iter()
                .filter_map(|segment| match segment {
                    Segment::Field(name) => Some(name),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Evaluate a path string against a node tree
pub fn query_node(root: &Node, path: &str) -> Result<Option<Node>> {
    let segments = parse_path(path)?;
    Ok(select(root, &segments))
}

/// Evaluate a path string against a JSON document
///
/// Simple paths run on the converted tree; anything else goes through
/// `jsonpath-rust`, whose matches always come back as a list.
pub fn query_json(value: Value, path: &str) -> Result<Option<Node>> {
    if is_complex(path) {
        return query_jsonpath(&value, path);
    }
    query_node(&Node::from_json(value), path)
}

fn query_jsonpath(value: &Value, path: &str) -> Result<Option<Node>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path)
        .map_err(|e| Error::json_path(format!("Invalid JSONPath '{path}': {e}")))?;

    match jp.find(value) {
        Value::Null => Ok(None),
        Value::Array(items) if items.is_empty() => Ok(None),
        Value::Array(items) => Ok(Some(Node::List(
            items.into_iter().map(Node::from_json).collect(),
        ))),
        other => Ok(Some(Node::from_json(other))),
    }
}
