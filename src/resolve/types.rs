//! Resolved query results

use crate::parse::{Node, TypeMap};
use crate::query::Query;

/// All entities of one query, with their resolved lookups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedSet {
    pub rows: Vec<ResolvedRow>,
    /// Declared types collected while parsing the query's pages
    pub types: TypeMap,
    /// Tag path of the entities from the document root, keys into `types`
    pub entity_path: Vec<String>,
    pub expand_arrays: bool,
    pub top_level_only: bool,
}

impl ResolvedSet {
    /// Empty result shaped by a query's flags
    pub fn for_query(query: &Query) -> Self {
        Self {
            rows: Vec::new(),
            types: TypeMap::new(),
            entity_path: Vec::new(),
            expand_arrays: query.expand_arrays(),
            top_level_only: query.top_level_only(),
        }
    }

    /// Append the rows and types of another result for the same lookup
    pub fn merge(&mut self, other: ResolvedSet) {
        self.rows.extend(other.rows);
        self.types.merge(other.types);
        if self.entity_path.is_empty() {
            self.entity_path = other.entity_path;
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One parent entity and the results of its lookups
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRow {
    pub entity: Node,
    /// One entry per lookup of the originating query, in declaration order
    pub children: Vec<ResolvedLookup>,
}

impl ResolvedRow {
    /// An entity without lookups
    pub fn new(entity: Node) -> Self {
        Self {
            entity,
            children: Vec::new(),
        }
    }
}

/// The child rows one lookup produced for one parent entity
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLookup {
    /// Column prefix
    pub prefix: String,
    pub result: ResolvedSet,
}
