//! Response tree parser
//!
//! Supports: JSON, XML (schema-less or against a declared schema)
//!
//! # Overview
//!
//! Bodies are parsed into a normalized [`Node`] tree. Untyped XML text is
//! narrowed to numbers and booleans where it parses as one; schema-aware XML
//! keeps raw text and records declared types in a [`TypeMap`] instead. A path
//! query then selects the entities the assembler turns into rows.

mod node;
mod parser;
mod path;
mod schema;
mod xml;

pub use node::{insert_repeated, Fields, Node, Scalar};
pub use parser::{parse_document, parse_response, ParseOptions, ParsedPage};
pub use path::{field_names, parse_path, query_json, query_node, select, Segment};
pub use schema::{parse_typed, SchemaElement, TypeMap};
pub use xml::{element_to_node, parse_untyped, read_document, Element};

#[cfg(test)]
mod tests;
