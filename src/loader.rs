//! Catalog Loading
//!
//! Parses one raw JSON document per namespace into a [`Namespace`] tree and
//! classifies every leaf. Purely structural: references are not followed and
//! flow shapes are not inspected here.

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::config::LoaderConfig;
use crate::error::{SchemaError, SchemaErrorKind};
use crate::model::{Group, LeafText, Node, QualifiedPath, PATH_SEPARATOR};

/// Body of a namespace document
#[derive(Debug, Clone)]
pub enum DocumentBody {
    /// Raw JSON text. Duplicate keys are detected.
    Text(String),
    /// Already-parsed JSON. Duplicate keys were collapsed by the parser and
    /// cannot be reported.
    Json(serde_json::Value),
}

/// One input document: the tree of a single namespace
#[derive(Debug, Clone)]
pub struct NamespaceDocument {
    pub namespace: String,
    pub body: DocumentBody,
}

impl NamespaceDocument {
    pub fn from_text(namespace: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            body: DocumentBody::Text(text.into()),
        }
    }

    /// Document from an already-parsed value.
    ///
    /// `serde_json::Value` keeps only the last of any duplicate keys, so this
    /// entry point cannot reject them. Prefer [`NamespaceDocument::from_text`]
    /// for source files.
    pub fn from_json(namespace: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            namespace: namespace.into(),
            body: DocumentBody::Json(value),
        }
    }
}

/// A loaded namespace; `root` is always a Group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub id: String,
    pub root: Node<LeafText>,
}

impl Namespace {
    pub fn lookup(&self, keys: &[String]) -> Option<&Node<LeafText>> {
        self.root.get(keys)
    }
}

/// Every namespace of one build generation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    namespaces: BTreeMap<String, Namespace>,
}

impl Forest {
    pub fn get(&self, id: &str) -> Option<&Namespace> {
        self.namespaces.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.namespaces.contains_key(id)
    }

    /// Node at a qualified path, if the namespace and every key exist
    pub fn lookup(&self, path: &QualifiedPath) -> Option<&Node<LeafText>> {
        self.namespaces.get(&path.namespace)?.lookup(&path.keys)
    }

    /// Namespaces in identifier order
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Qualified path of every leaf in the forest
    pub fn leaf_paths(&self) -> Vec<QualifiedPath> {
        self.namespaces
            .values()
            .flat_map(|ns| {
                ns.root
                    .leaves()
                    .into_iter()
                    .map(move |(keys, _)| QualifiedPath::new(ns.id.clone(), keys))
            })
            .collect()
    }
}

/// Load every document, collecting all schema errors.
///
/// Namespaces are independent, so above `config.parallel_threshold`
/// documents they are parsed on scoped worker threads.
pub fn load_forest(
    documents: &[NamespaceDocument],
    config: &LoaderConfig,
) -> Result<Forest, Vec<SchemaError>> {
    let results: Vec<Result<Namespace, Vec<SchemaError>>> =
        if config.parallel_threshold > 0 && documents.len() >= config.parallel_threshold {
            load_parallel(documents)
        } else {
            documents.iter().map(load_namespace).collect()
        };

    let mut errors = Vec::new();
    let mut namespaces = BTreeMap::new();
    for result in results {
        match result {
            Ok(namespace) => {
                if namespaces.contains_key(&namespace.id) {
                    errors.push(SchemaError::new(
                        QualifiedPath::root(namespace.id.clone()),
                        SchemaErrorKind::DuplicateNamespace,
                    ));
                } else {
                    namespaces.insert(namespace.id.clone(), namespace);
                }
            }
            Err(mut errs) => errors.append(&mut errs),
        }
    }

    if errors.is_empty() {
        tracing::debug!(namespaces = namespaces.len(), "loaded catalog forest");
        Ok(Forest { namespaces })
    } else {
        Err(errors)
    }
}

fn load_parallel(documents: &[NamespaceDocument]) -> Vec<Result<Namespace, Vec<SchemaError>>> {
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let chunk_size = documents.len().div_ceil(workers).max(1);

    std::thread::scope(|scope| {
        let handles: Vec<_> = documents
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || chunk.iter().map(load_namespace).collect::<Vec<_>>()))
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(results) => results,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

/// Parse a single namespace document
pub fn load_namespace(document: &NamespaceDocument) -> Result<Namespace, Vec<SchemaError>> {
    let root_path = QualifiedPath::root(document.namespace.clone());
    if document.namespace.trim().is_empty() {
        return Err(vec![SchemaError::new(root_path, SchemaErrorKind::EmptyNamespace)]);
    }
    if document.namespace.contains(PATH_SEPARATOR) {
        return Err(vec![SchemaError::new(
            root_path,
            SchemaErrorKind::InvalidKey {
                key: document.namespace.clone(),
            },
        )]);
    }

    let raw = match &document.body {
        DocumentBody::Text(text) => serde_json::from_str::<RawNode>(text).map_err(|e| {
            vec![SchemaError::new(
                root_path.clone(),
                SchemaErrorKind::InvalidJson {
                    message: e.to_string(),
                },
            )]
        })?,
        DocumentBody::Json(value) => {
            tracing::debug!(
                namespace = %document.namespace,
                "loading pre-parsed document; duplicate keys cannot be detected"
            );
            RawNode::from(value)
        }
    };

    let entries = match raw {
        RawNode::Object(entries) => entries,
        other => {
            return Err(vec![SchemaError::new(
                root_path,
                SchemaErrorKind::RootNotObject {
                    found: other.kind_name(),
                },
            )])
        }
    };

    let mut errors = Vec::new();
    let root = build_group(entries, &root_path, &mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }

    tracing::trace!(namespace = %document.namespace, leaves = root.leaf_count(), "loaded namespace");
    Ok(Namespace {
        id: document.namespace.clone(),
        root,
    })
}

fn build_group(
    entries: Vec<(String, RawNode)>,
    path: &QualifiedPath,
    errors: &mut Vec<SchemaError>,
) -> Node<LeafText> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut group = Group::new();

    for (key, raw) in entries {
        let child_path = path.child(&key);
        if !seen.insert(key.clone()) {
            errors.push(SchemaError::new(
                child_path,
                SchemaErrorKind::DuplicateKey { key },
            ));
            continue;
        }
        if key.is_empty() || key.contains(PATH_SEPARATOR) {
            errors.push(SchemaError::new(child_path, SchemaErrorKind::InvalidKey { key }));
            continue;
        }
        if let Some(node) = build_node(raw, &child_path, errors) {
            group.insert(key, node);
        }
    }

    Node::Group(group)
}

fn build_node(
    raw: RawNode,
    path: &QualifiedPath,
    errors: &mut Vec<SchemaError>,
) -> Option<Node<LeafText>> {
    match raw {
        RawNode::Text(text) => match LeafText::classify(&text) {
            Ok(leaf) => Some(Node::Leaf(leaf)),
            Err(reason) => {
                errors.push(SchemaError::new(
                    path.clone(),
                    SchemaErrorKind::MalformedReference { text, reason },
                ));
                None
            }
        },
        RawNode::Object(entries) => Some(build_group(entries, path, errors)),
        RawNode::Other(found) => {
            errors.push(SchemaError::new(
                path.clone(),
                SchemaErrorKind::InvalidNodeType { found },
            ));
            None
        }
    }
}

// =============================================================================
// Raw document tree
// =============================================================================

/// JSON as written, with object entries kept in source order so duplicate
/// keys survive parsing
#[derive(Debug, Clone, PartialEq)]
enum RawNode {
    Text(String),
    Object(Vec<(String, RawNode)>),
    Other(&'static str),
}

impl RawNode {
    fn kind_name(&self) -> &'static str {
        match self {
            RawNode::Text(_) => "string",
            RawNode::Object(_) => "object",
            RawNode::Other(kind) => kind,
        }
    }
}

impl From<&serde_json::Value> for RawNode {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => RawNode::Text(s.clone()),
            serde_json::Value::Object(map) => RawNode::Object(
                map.iter().map(|(k, v)| (k.clone(), RawNode::from(v))).collect(),
            ),
            serde_json::Value::Array(_) => RawNode::Other("array"),
            serde_json::Value::Number(_) => RawNode::Other("number"),
            serde_json::Value::Bool(_) => RawNode::Other("boolean"),
            serde_json::Value::Null => RawNode::Other("null"),
        }
    }
}

impl<'de> Deserialize<'de> for RawNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawNodeVisitor)
    }
}

struct RawNodeVisitor;

impl<'de> Visitor<'de> for RawNodeVisitor {
    type Value = RawNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or an object")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RawNode, E> {
        Ok(RawNode::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<RawNode, E> {
        Ok(RawNode::Text(v))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<RawNode, E> {
        Ok(RawNode::Other("boolean"))
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<RawNode, E> {
        Ok(RawNode::Other("number"))
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<RawNode, E> {
        Ok(RawNode::Other("number"))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<RawNode, E> {
        Ok(RawNode::Other("number"))
    }

    fn visit_unit<E: de::Error>(self) -> Result<RawNode, E> {
        Ok(RawNode::Other("null"))
    }

    fn visit_none<E: de::Error>(self) -> Result<RawNode, E> {
        Ok(RawNode::Other("null"))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RawNode, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(RawNode::Other("array"))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawNode, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, RawNode>()? {
            entries.push((key, value));
        }
        Ok(RawNode::Object(entries))
    }
}
