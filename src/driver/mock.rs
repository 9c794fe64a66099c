//! An in-memory driver over a tiny well-formed markup subset.
//!
//! This is a test collaborator, kept public so downstream crates can
//! exercise their targets without a real DOM library. It understands
//! nested tags, quoted attributes, text and void tags; it is not a
//! production parser (no entities, no comments inside attribute values,
//! no error recovery worth the name).
//!
//! Selectors are tag names, optionally comma-separated. Matches are
//! returned in document order.

use super::{Driver, DriverError, Projection};
use crate::engine::is_http_url;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug)]
enum Piece {
    Element(usize),
    Text(String),
}

#[derive(Debug)]
struct Node {
    /// Empty for the synthetic root.
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Piece>,
}

#[derive(Debug)]
struct Arena {
    nodes: Vec<Node>,
}

/// A parsed document. Immutable after load.
#[derive(Debug)]
pub struct MockDocument {
    arena: Rc<Arena>,
}

/// An identity-only handle to one element of a [`MockDocument`].
#[derive(Clone)]
pub struct MockElement {
    arena: Rc<Arena>,
    id: usize,
}

impl MockElement {
    pub fn tag(&self) -> &str {
        &self.arena.nodes[self.id].tag
    }
}

impl PartialEq for MockElement {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.arena, &other.arena)
    }
}

impl fmt::Debug for MockElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MockElement(<{}> #{})", self.tag(), self.id)
    }
}

/// A [`Driver`] backed by the mock document tree.
#[derive(Debug, Default)]
pub struct MockDriver;

impl Driver for MockDriver {
    type Document = MockDocument;
    type Element = MockElement;

    fn load(&self, source: &str) -> Result<MockDocument, DriverError> {
        if is_http_url(source) {
            return Err(DriverError::new("mock driver cannot fetch remote sources"));
        }
        Ok(MockDocument {
            arena: Rc::new(parse(source)?),
        })
    }

    fn select(
        &self,
        document: &MockDocument,
        selectors: &str,
        context: Option<&MockElement>,
    ) -> Result<Vec<MockElement>, DriverError> {
        let tags: Vec<String> = selectors
            .split(',')
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        if tags.is_empty() {
            return Err(DriverError::new("empty selector"));
        }
        let start = context.map_or(0, |element| element.id);
        let mut ids = Vec::new();
        document.arena.collect_matches(start, &tags, &mut ids);
        Ok(ids
            .into_iter()
            .map(|id| MockElement {
                arena: Rc::clone(&document.arena),
                id,
            })
            .collect())
    }

    fn project(
        &self,
        element: &MockElement,
        projection: &Projection,
    ) -> Result<Value<MockElement>, DriverError> {
        let arena = &element.arena;
        Ok(match projection {
            Projection::Raw => Value::Element(element.clone()),
            Projection::Text => {
                let mut text = String::new();
                arena.text_content(element.id, &mut text);
                Value::String(text)
            }
            Projection::InnerHtml => {
                let mut markup = String::new();
                arena.inner_markup(element.id, &mut markup);
                Value::String(markup)
            }
            Projection::OuterHtml => {
                let mut markup = String::new();
                arena.outer_markup(element.id, &mut markup);
                Value::String(markup)
            }
            Projection::Attribute(name) => arena.nodes[element.id]
                .attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| Value::String(v.clone()))
                .unwrap_or(Value::Null),
        })
    }
}

impl Arena {
    /// Preorder walk below `start`, collecting elements whose tag is in
    /// `tags`. Preorder is document order, which the driver contract
    /// requires.
    fn collect_matches(&self, start: usize, tags: &[String], out: &mut Vec<usize>) {
        for child in &self.nodes[start].children {
            if let Piece::Element(id) = child {
                if tags.iter().any(|t| t == &self.nodes[*id].tag) {
                    out.push(*id);
                }
                self.collect_matches(*id, tags, out);
            }
        }
    }

    fn text_content(&self, id: usize, out: &mut String) {
        for child in &self.nodes[id].children {
            match child {
                Piece::Text(text) => out.push_str(text),
                Piece::Element(child_id) => self.text_content(*child_id, out),
            }
        }
    }

    fn inner_markup(&self, id: usize, out: &mut String) {
        for child in &self.nodes[id].children {
            match child {
                Piece::Text(text) => out.push_str(text),
                Piece::Element(child_id) => self.outer_markup(*child_id, out),
            }
        }
    }

    fn outer_markup(&self, id: usize, out: &mut String) {
        let node = &self.nodes[id];
        out.push('<');
        out.push_str(&node.tag);
        for (name, value) in &node.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(value);
            out.push('"');
        }
        out.push('>');
        if !VOID_TAGS.contains(&node.tag.as_str()) {
            self.inner_markup(id, out);
            out.push_str("</");
            out.push_str(&node.tag);
            out.push('>');
        }
    }
}

fn parse(input: &str) -> Result<Arena, DriverError> {
    let mut nodes = vec![Node {
        tag: String::new(),
        attributes: Vec::new(),
        children: Vec::new(),
    }];
    let mut stack: Vec<usize> = vec![0];
    let mut rest = input;

    while !rest.is_empty() {
        let Some(pos) = rest.find('<') else {
            push_text(&mut nodes, &stack, rest);
            break;
        };
        if pos > 0 {
            push_text(&mut nodes, &stack, &rest[..pos]);
        }
        rest = &rest[pos..];

        if rest.starts_with("<!") {
            // Doctype or comment: skip to the closing angle bracket.
            let end = rest
                .find('>')
                .ok_or_else(|| DriverError::new("unterminated markup declaration"))?;
            rest = &rest[end + 1..];
        } else if let Some(tail) = rest.strip_prefix("</") {
            let end = tail
                .find('>')
                .ok_or_else(|| DriverError::new("unterminated closing tag"))?;
            let name = tail[..end].trim().to_ascii_lowercase();
            // Close back to the nearest matching open element; a stray
            // closing tag is ignored. The root frame never pops.
            if let Some(at) = stack.iter().rposition(|&id| nodes[id].tag == name) {
                if at > 0 {
                    stack.truncate(at);
                }
            }
            rest = &tail[end + 1..];
        } else {
            let end = rest
                .find('>')
                .ok_or_else(|| DriverError::new("unterminated tag"))?;
            let mut inner = &rest[1..end];
            let self_closing = inner.ends_with('/');
            if self_closing {
                inner = &inner[..inner.len() - 1];
            }
            let (tag, attributes) = parse_tag(inner)?;
            let id = nodes.len();
            let void = VOID_TAGS.contains(&tag.as_str());
            nodes.push(Node {
                tag,
                attributes,
                children: Vec::new(),
            });
            let parent = *stack.last().unwrap_or(&0);
            nodes[parent].children.push(Piece::Element(id));
            if !self_closing && !void {
                stack.push(id);
            }
            rest = &rest[end + 1..];
        }
    }

    Ok(Arena { nodes })
}

fn push_text(nodes: &mut [Node], stack: &[usize], text: &str) {
    let parent = *stack.last().unwrap_or(&0);
    nodes[parent].children.push(Piece::Text(text.to_string()));
}

fn parse_tag(inner: &str) -> Result<(String, Vec<(String, String)>), DriverError> {
    let inner = inner.trim();
    let name_end = inner
        .find(|c: char| c.is_whitespace())
        .unwrap_or(inner.len());
    let tag = inner[..name_end].to_ascii_lowercase();
    if tag.is_empty() {
        return Err(DriverError::new("empty tag name"));
    }

    let mut attributes = Vec::new();
    let mut rest = inner[name_end..].trim_start();
    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_string();
        rest = rest[name_end..].trim_start();
        let value = if let Some(tail) = rest.strip_prefix('=') {
            let tail = tail.trim_start();
            if let Some(quoted) = tail.strip_prefix('"') {
                let close = quoted
                    .find('"')
                    .ok_or_else(|| DriverError::new("unterminated attribute value"))?;
                rest = &quoted[close + 1..];
                quoted[..close].to_string()
            } else if let Some(quoted) = tail.strip_prefix('\'') {
                let close = quoted
                    .find('\'')
                    .ok_or_else(|| DriverError::new("unterminated attribute value"))?;
                rest = &quoted[close + 1..];
                quoted[..close].to_string()
            } else {
                let end = tail
                    .find(|c: char| c.is_whitespace())
                    .unwrap_or(tail.len());
                rest = &tail[end..];
                tail[..end].to_string()
            }
        } else {
            String::new()
        };
        if !name.is_empty() {
            attributes.push((name, value));
        }
        rest = rest.trim_start();
    }

    Ok((tag, attributes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(markup: &str) -> MockDocument {
        MockDriver.load(markup).unwrap()
    }

    #[test]
    fn selects_in_document_order() {
        let doc = load("<main><h1>A</h1><p><h1>B</h1></p></main><h1>C</h1>");
        let matched = MockDriver.select(&doc, "h1", None).unwrap();
        let texts: Vec<_> = matched
            .iter()
            .map(|e| {
                MockDriver
                    .project(e, &Projection::Text)
                    .unwrap()
                    .coerce_string()
            })
            .collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[test]
    fn select_scopes_to_context_subtree() {
        let doc = load("<section><h1>IN</h1></section><h1>OUT</h1>");
        let sections = MockDriver.select(&doc, "section", None).unwrap();
        let scoped = MockDriver.select(&doc, "h1", Some(&sections[0])).unwrap();
        assert_eq!(scoped.len(), 1);
        let text = MockDriver.project(&scoped[0], &Projection::Text).unwrap();
        assert_eq!(text, Value::String("IN".to_string()));
    }

    #[test]
    fn comma_selector_matches_either_tag() {
        let doc = load("<h1>A</h1><h2>B</h2><h3>C</h3>");
        let matched = MockDriver.select(&doc, "h1, h3", None).unwrap();
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn text_concatenates_across_void_tags() {
        let doc = load("<h1>TEST<br>TEST</h1>");
        let h1 = &MockDriver.select(&doc, "h1", None).unwrap()[0];
        assert_eq!(
            MockDriver.project(h1, &Projection::Text).unwrap(),
            Value::String("TESTTEST".to_string())
        );
        assert_eq!(
            MockDriver.project(h1, &Projection::InnerHtml).unwrap(),
            Value::String("TEST<br>TEST".to_string())
        );
    }

    #[test]
    fn outer_markup_reconstructs_element() {
        let doc = load("<main><h1 id=\"t\">TEST</h1></main>");
        let h1 = &MockDriver.select(&doc, "h1", None).unwrap()[0];
        assert_eq!(
            MockDriver.project(h1, &Projection::OuterHtml).unwrap(),
            Value::String("<h1 id=\"t\">TEST</h1>".to_string())
        );
    }

    #[test]
    fn attribute_projection_handles_missing() {
        let doc = load("<h1 data-test='ATTRIBUTE'>TEST</h1>");
        let h1 = &MockDriver.select(&doc, "h1", None).unwrap()[0];
        assert_eq!(
            MockDriver
                .project(h1, &Projection::Attribute("data-test".to_string()))
                .unwrap(),
            Value::String("ATTRIBUTE".to_string())
        );
        assert_eq!(
            MockDriver
                .project(h1, &Projection::Attribute("missing".to_string()))
                .unwrap(),
            Value::Null
        );
    }

    #[test]
    fn load_refuses_remote_sources() {
        assert!(MockDriver.load("https://example.com/page").is_err());
    }

    #[test]
    fn skips_doctype_and_comments() {
        let doc = load("<!DOCTYPE html><!-- note --><h1>TEST</h1>");
        assert_eq!(MockDriver.select(&doc, "h1", None).unwrap().len(), 1);
    }
}
