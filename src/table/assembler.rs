//! Tabular assembly
//!
//! Flattens a resolved result into rows. Nested fields become dotted column
//! names, expanded lists multiply rows, and every lookup's rows are
//! cross-joined onto the parent row under the lookup's prefix.

use super::types::{Column, Table};
use crate::parse::{Node, Scalar, TypeMap};
use crate::resolve::{ResolvedRow, ResolvedSet};
use crate::types::ScalarType;
use indexmap::IndexMap;

/// Column name used for entities that are not composites
pub const VALUE_COLUMN: &str = "value";

/// One flattened value with the type its schema declares, if any
#[derive(Debug, Clone)]
struct Cell {
    column: String,
    value: Scalar,
    declared: Option<ScalarType>,
}

/// A partial row
type Fragment = Vec<Cell>;

/// Assemble a resolved result into a table
///
/// Columns appear in first-seen order. A column's type is the declared
/// schema type when there is one, otherwise the type of its first non-null
/// value.
pub fn assemble(set: &ResolvedSet) -> Table {
    let fragments = set_fragments(set);

    let mut columns: IndexMap<String, ColumnType> = IndexMap::new();
    for cell in fragments.iter().flatten() {
        columns
            .entry(cell.column.clone())
            .or_default()
            .observe(cell);
    }

    let rows = fragments
        .into_iter()
        .map(|fragment| {
            let mut row = vec![Scalar::Null; columns.len()];
            for cell in fragment {
                if let Some((index, _, column)) = columns.get_full(&cell.column) {
                    row[index] = match column.declared {
                        Some(ty) => cell.value.coerce(ty),
                        None => cell.value,
                    };
                }
            }
            row
        })
        .collect();

    let columns = columns
        .into_iter()
        .map(|(name, ty)| Column::new(name, ty.resolve()))
        .collect();

    Table::new(columns, rows)
}

#[derive(Debug, Default)]
struct ColumnType {
    declared: Option<ScalarType>,
    inferred: Option<ScalarType>,
}

impl ColumnType {
    fn observe(&mut self, cell: &Cell) {
        if self.declared.is_none() {
            self.declared = cell.declared;
        }
        if self.inferred.is_none() {
            self.inferred = cell.value.inferred_type();
        }
    }

    fn resolve(&self) -> ScalarType {
        self.declared.or(self.inferred).unwrap_or_default()
    }
}

// ============================================================================
// Flattening
// ============================================================================

fn set_fragments(set: &ResolvedSet) -> Vec<Fragment> {
    set.rows
        .iter()
        .flat_map(|row| row_fragments(row, set))
        .collect()
}

fn row_fragments(row: &ResolvedRow, set: &ResolvedSet) -> Vec<Fragment> {
    let flattener = Flattener {
        expand_arrays: set.expand_arrays,
        top_level_only: set.top_level_only,
        types: &set.types,
        entity_path: &set.entity_path,
    };
    let mut fragments = flattener.node(&row.entity, &[], 0);

    for lookup in &row.children {
        let children: Vec<Fragment> = set_fragments(&lookup.result)
            .into_iter()
            .map(|fragment| {
                fragment
                    .into_iter()
                    .map(|cell| Cell {
                        column: format!("{}.{}", lookup.prefix, cell.column),
                        ..cell
                    })
                    .collect()
            })
            .collect();
        fragments = cross_join(&fragments, &children);
    }

    fragments
}

fn cross_join(left: &[Fragment], right: &[Fragment]) -> Vec<Fragment> {
    let mut joined = Vec::with_capacity(left.len() * right.len());
    for l in left {
        for r in right {
            let mut fragment = l.clone();
            fragment.extend(r.iter().cloned());
            joined.push(fragment);
        }
    }
    joined
}

struct Flattener<'a> {
    expand_arrays: bool,
    top_level_only: bool,
    types: &'a TypeMap,
    entity_path: &'a [String],
}

impl Flattener<'_> {
    /// Flatten `node` found at `path`; `lists` counts the lists expanded so far
    fn node(&self, node: &Node, path: &[String], lists: usize) -> Vec<Fragment> {
        match node {
            Node::Scalar(value) => vec![vec![self.cell(path, value.clone())]],
            Node::Composite(fields) => {
                let mut fragments: Vec<Fragment> = vec![Vec::new()];
                for (name, child) in fields {
                    let mut child_path = path.to_vec();
                    child_path.push(name.clone());
                    let child = self.node(child, &child_path, lists);
                    fragments = cross_join(&fragments, &child);
                }
                fragments
            }
            Node::List(items) if self.expands(lists) => {
                if items.is_empty() {
                    return vec![vec![self.cell(path, Scalar::Null)]];
                }
                items
                    .iter()
                    .flat_map(|item| self.node(item, path, lists + 1))
                    .collect()
            }
            Node::List(_) => {
                let text = node.to_json().to_string();
                vec![vec![self.cell(path, Scalar::String(text))]]
            }
        }
    }

    fn expands(&self, lists: usize) -> bool {
        self.expand_arrays && (!self.top_level_only || lists == 0)
    }

    /// A value at `path` below the entity; the entity itself lands in the value column
    fn cell(&self, path: &[String], value: Scalar) -> Cell {
        let column = if path.is_empty() {
            VALUE_COLUMN.to_string()
        } else {
            path.join(".")
        };
        Cell {
            column,
            value,
            declared: self.declared(path),
        }
    }

    fn declared(&self, path: &[String]) -> Option<ScalarType> {
        if self.types.is_empty() {
            return None;
        }
        let full: Vec<String> = self.entity_path.iter().chain(path).cloned().collect();
        self.types.get(&full)
    }
}
