//! Catalog Schema Model
//!
//! Node types shared by the loader, resolver, validator and catalog. A node
//! is either a Leaf carrying text or a Group of keyed children; leaf text is
//! classified once, at load time, and never re-dispatched afterwards.

pub mod path;
pub mod template;

pub use path::{QualifiedPath, ReferenceTarget, PATH_SEPARATOR, REFERENCE_CLOSE, REFERENCE_OPEN};
pub use template::{Segment, Template};

use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Keyed children of a Group. Ordered so every traversal is deterministic.
pub type Group<T> = BTreeMap<String, Node<T>>;

/// A node in a namespace tree, generic over its leaf payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Node<T> {
    Leaf(T),
    Group(Group<T>),
}

impl<T> Node<T> {
    pub fn as_leaf(&self) -> Option<&T> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group<T>> {
        match self {
            Node::Group(group) => Some(group),
            Node::Leaf(_) => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Walk `keys` down from this node
    pub fn get(&self, keys: &[String]) -> Option<&Node<T>> {
        let mut node = self;
        for key in keys {
            node = node.as_group()?.get(key)?;
        }
        Some(node)
    }

    /// Every leaf below this node with its key path, in key order
    pub fn leaves(&self) -> Vec<(Vec<String>, &T)> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        self.collect_leaves(&mut prefix, &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: &mut Vec<String>, out: &mut Vec<(Vec<String>, &'a T)>) {
        match self {
            Node::Leaf(leaf) => out.push((prefix.clone(), leaf)),
            Node::Group(group) => {
                for (key, child) in group {
                    prefix.push(key.clone());
                    child.collect_leaves(prefix, out);
                    prefix.pop();
                }
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Group(group) => group.values().map(Node::leaf_count).sum(),
        }
    }
}

/// Leaf text as loaded from a source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafText {
    /// No markers at all
    Plain(String),
    /// The whole text is one `[%key:...%]` token
    Reference(ReferenceTarget),
    /// Literal text interleaved with `{name}` placeholders
    Templated(Template),
}

impl LeafText {
    /// Classify raw leaf text.
    ///
    /// A text whose trimmed form is exactly one reference token is a
    /// Reference; any other occurrence of the reference marker is malformed.
    /// Otherwise the text is Templated when it holds a placeholder span, and
    /// Plain when it does not.
    pub fn classify(text: &str) -> Result<Self, String> {
        if !text.contains(REFERENCE_OPEN) {
            return Ok(match Template::parse(text) {
                Some(template) => LeafText::Templated(template),
                None => LeafText::Plain(text.to_string()),
            });
        }

        let trimmed = text.trim();
        let inner = trimmed
            .strip_prefix(REFERENCE_OPEN)
            .and_then(|rest| rest.strip_suffix(REFERENCE_CLOSE))
            .ok_or_else(|| "reference token must make up the entire text".to_string())?;
        if inner.contains(REFERENCE_OPEN) || inner.contains(REFERENCE_CLOSE) {
            return Err("text holds more than one reference token".to_string());
        }
        ReferenceTarget::parse(inner).map(LeafText::Reference)
    }

    pub fn as_reference(&self) -> Option<&ReferenceTarget> {
        match self {
            LeafText::Reference(target) => Some(target),
            _ => None,
        }
    }
}

/// Leaf text after resolution: references are gone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedText {
    Plain(String),
    Templated(Template),
}

impl ResolvedText {
    /// The stored text, placeholders unexpanded
    pub fn as_str(&self) -> &str {
        match self {
            ResolvedText::Plain(text) => text,
            ResolvedText::Templated(template) => template.source(),
        }
    }

    /// Placeholder names the text requires (empty for plain text)
    pub fn placeholders(&self) -> BTreeSet<&str> {
        match self {
            ResolvedText::Plain(_) => BTreeSet::new(),
            ResolvedText::Templated(template) => {
                template.placeholders().iter().map(String::as_str).collect()
            }
        }
    }

    /// Final presentation text; plain text ignores `values` entirely
    pub fn render(&self, values: &HashMap<String, String>) -> Result<String, String> {
        match self {
            ResolvedText::Plain(text) => Ok(text.clone()),
            ResolvedText::Templated(template) => template.render(values),
        }
    }
}

impl Serialize for ResolvedText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
