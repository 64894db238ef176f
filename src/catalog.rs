//! Catalog Snapshot
//!
//! The immutable, fully resolved result of a build. Every leaf is plain or
//! templated text; placeholders are substituted per call by [`Catalog::format`]
//! and never stored.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::checksum::Checksum;
use crate::error::{FormatError, PlaceholderMissingError, UnknownPathError};
use crate::loader::NamespaceDocument;
use crate::model::{Node, QualifiedPath, ResolvedText};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    namespaces: BTreeMap<String, Node<ResolvedText>>,
    fingerprint: Checksum,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::from_namespaces(BTreeMap::new())
    }
}

impl Catalog {
    /// A catalog with no namespaces
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_namespaces(namespaces: BTreeMap<String, Node<ResolvedText>>) -> Self {
        let fingerprint = Checksum::from_entries(namespaces.iter().flat_map(|(id, root)| {
            root.leaves()
                .into_iter()
                .map(move |(keys, text)| (QualifiedPath::new(id.clone(), keys).to_string(), text.as_str()))
        }));
        Self {
            namespaces,
            fingerprint,
        }
    }

    /// Resolved text at `path`, if it names a leaf
    pub fn get(&self, path: &QualifiedPath) -> Option<&ResolvedText> {
        self.namespaces.get(&path.namespace)?.get(&path.keys)?.as_leaf()
    }

    /// Resolved text at a `namespace::key::...` path
    pub fn lookup(&self, path: &str) -> Result<&ResolvedText, UnknownPathError> {
        QualifiedPath::parse(path)
            .and_then(|qualified| self.get(&qualified))
            .ok_or_else(|| UnknownPathError {
                path: path.to_string(),
            })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_ok()
    }

    /// Look up `path` and fill its placeholders from `values`.
    ///
    /// Plain text ignores `values`. Templated text needs an entry for every
    /// placeholder it holds; extra entries are ignored. Substitution is a
    /// single literal pass over the stored text.
    pub fn format(&self, path: &str, values: &HashMap<String, String>) -> Result<String, FormatError> {
        let qualified = QualifiedPath::parse(path).ok_or_else(|| UnknownPathError {
            path: path.to_string(),
        })?;
        let text = self.get(&qualified).ok_or_else(|| UnknownPathError {
            path: path.to_string(),
        })?;
        text.render(values).map_err(|token| {
            FormatError::from(PlaceholderMissingError {
                path: qualified,
                token,
            })
        })
    }

    /// Placeholder names the text at `path` requires
    pub fn placeholders(&self, path: &str) -> Result<BTreeSet<&str>, UnknownPathError> {
        self.lookup(path).map(ResolvedText::placeholders)
    }

    /// Root Group of a namespace
    pub fn namespace(&self, id: &str) -> Option<&Node<ResolvedText>> {
        self.namespaces.get(id)
    }

    /// Namespace identifiers in order
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    /// Every leaf with its qualified path, ordered by namespace then keys
    pub fn entries(&self) -> Vec<(QualifiedPath, &ResolvedText)> {
        self.namespaces
            .iter()
            .flat_map(|(id, root)| {
                root.leaves()
                    .into_iter()
                    .map(move |(keys, text)| (QualifiedPath::new(id.clone(), keys), text))
            })
            .collect()
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.namespaces.values().map(Node::leaf_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fingerprint(&self) -> &Checksum {
        &self.fingerprint
    }

    /// Flat `{ "namespace::key::...": "text" }` object
    pub fn to_flat_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .entries()
            .into_iter()
            .map(|(path, text)| (path.to_string(), serde_json::Value::String(text.as_str().to_string())))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Serialise each namespace back into a source document.
    ///
    /// Building these documents again yields an identical catalog.
    pub fn to_documents(&self) -> Result<Vec<NamespaceDocument>, serde_json::Error> {
        self.namespaces
            .iter()
            .map(|(id, root)| {
                serde_json::to_string_pretty(root).map(|text| NamespaceDocument::from_text(id.clone(), text))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Group, Template};

    fn catalog() -> Catalog {
        let mut issues = Group::new();
        issues.insert(
            "title".to_string(),
            Node::Leaf(ResolvedText::Templated(
                Template::parse("The currency {currency} is no longer in use").unwrap(),
            )),
        );
        let mut root = Group::new();
        root.insert("issues".to_string(), Node::Group(issues));
        root.insert(
            "title".to_string(),
            Node::Leaf(ResolvedText::Plain("Open Exchange Rates".into())),
        );

        let mut namespaces = BTreeMap::new();
        namespaces.insert("openexchangerates".to_string(), Node::Group(root));
        Catalog::from_namespaces(namespaces)
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_format_templated_text() {
        let catalog = catalog();
        assert_eq!(
            catalog
                .format("openexchangerates::issues::title", &values(&[("currency", "USD")]))
                .unwrap(),
            "The currency USD is no longer in use"
        );
    }

    #[test]
    fn test_format_missing_placeholder() {
        let err = catalog()
            .format("openexchangerates::issues::title", &HashMap::new())
            .unwrap_err();
        assert_eq!(
            err,
            FormatError::PlaceholderMissing(PlaceholderMissingError {
                path: QualifiedPath::parse("openexchangerates::issues::title").unwrap(),
                token: "currency".into(),
            })
        );
    }

    #[test]
    fn test_plain_text_ignores_values() {
        assert_eq!(
            catalog()
                .format("openexchangerates::title", &values(&[("currency", "USD")]))
                .unwrap(),
            "Open Exchange Rates"
        );
    }

    #[test]
    fn test_unknown_paths() {
        let catalog = catalog();
        for path in ["openexchangerates::missing", "openexchangerates::issues", "nope::title", "garbage"] {
            assert_eq!(
                catalog.format(path, &HashMap::new()),
                Err(FormatError::UnknownPath(UnknownPathError { path: path.into() }))
            );
        }
    }

    #[test]
    fn test_entries_len_and_flat_json() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 2);
        let paths: Vec<String> = catalog.entries().into_iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(
            paths,
            vec!["openexchangerates::issues::title", "openexchangerates::title"]
        );
        assert_eq!(
            catalog.to_flat_json()["openexchangerates::title"],
            serde_json::json!("Open Exchange Rates")
        );
        assert_eq!(
            catalog.placeholders("openexchangerates::issues::title").unwrap(),
            BTreeSet::from(["currency"])
        );
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        assert_eq!(catalog().fingerprint(), catalog().fingerprint());
        assert_ne!(catalog().fingerprint(), Catalog::empty().fingerprint());
    }
}
