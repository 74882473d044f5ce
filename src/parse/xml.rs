//! XML reading
//!
//! Documents are first read into a plain [`Element`] tree with `quick-xml`,
//! then converted into [`Node`]s either schema-less (narrowing text) or
//! against a declared schema (see [`super::schema`]).

use super::node::{insert_repeated, Fields, Node, Scalar};
use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// A raw XML element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::xml(format!("Bad attribute on <{name}>: {e}")))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::xml(format!("Bad attribute value on <{name}>: {e}")))?
                .to_string();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Default::default()
        })
    }

    /// Check for an element with no children, attributes or text
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.attributes.is_empty() && self.text.is_empty()
    }
}

/// Read a document into its root element
pub fn read_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => stack.push(Element::from_start(&e)?),
            Ok(Event::Empty(e)) => {
                let element = Element::from_start(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::xml("Unexpected closing tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::xml(format!("Bad text content: {e}")))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(text.trim());
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::xml(format!(
                    "Error at position {}: {e}",
                    reader.error_position()
                )))
            }
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(Error::xml("Unexpected end of document"));
    }
    root.ok_or_else(|| Error::xml("Document has no root element"))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::xml("Document has more than one root element")),
    }
    Ok(())
}

// ============================================================================
// Schema-less conversion
// ============================================================================

/// Parse a document without a schema
///
/// The result is a composite holding the root element under its tag name, so
/// paths start at the root tag (`orders/order`).
pub fn parse_untyped(xml: &str) -> Result<Node> {
    let root = read_document(xml)?;
    let mut fields = Fields::new();
    let name = root.name.clone();
    fields.insert(name, element_to_node(&root));
    Ok(Node::Composite(fields))
}

/// Convert an element, narrowing leaf text
pub fn element_to_node(element: &Element) -> Node {
    if element.is_empty() {
        return Node::null();
    }

    if element.children.is_empty() && element.attributes.is_empty() {
        return Node::Scalar(Scalar::narrow(&element.text));
    }

    let mut fields = Fields::new();
    for (key, value) in &element.attributes {
        fields.insert(format!("@{key}"), Node::Scalar(Scalar::narrow(value)));
    }
    for child in &element.children {
        insert_repeated(&mut fields, child.name.clone(), element_to_node(child));
    }
    if !element.text.is_empty() {
        fields.insert("#text".to_string(), Node::Scalar(Scalar::narrow(&element.text)));
    }
    Node::Composite(fields)
}
