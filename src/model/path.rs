//! Qualified paths and reference targets

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between namespace and key segments: `waqi::config::step::user`
pub const PATH_SEPARATOR: &str = "::";

/// Opening marker of a reference token
pub const REFERENCE_OPEN: &str = "[%key:";

/// Closing marker of a reference token
pub const REFERENCE_CLOSE: &str = "%]";

/// A node location: owning namespace plus the Group keys leading to it.
///
/// An empty `keys` list addresses the namespace root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QualifiedPath {
    pub namespace: String,
    pub keys: Vec<String>,
}

impl QualifiedPath {
    pub fn new<I, S>(namespace: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace: namespace.into(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Path of a namespace's root Group
    pub fn root(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            keys: Vec::new(),
        }
    }

    /// Path of a direct child of this node
    pub fn child(&self, key: &str) -> Self {
        let mut keys = Vec::with_capacity(self.keys.len() + 1);
        keys.extend(self.keys.iter().cloned());
        keys.push(key.to_string());
        Self {
            namespace: self.namespace.clone(),
            keys,
        }
    }

    /// Parse `namespace::key::...::key`.
    ///
    /// Requires a namespace and at least one key; empty segments are rejected.
    pub fn parse(qualified: &str) -> Option<Self> {
        let mut segments = qualified.split(PATH_SEPARATOR);
        let namespace = segments.next()?.to_string();
        let keys: Vec<String> = segments.map(str::to_string).collect();
        if namespace.is_empty() || keys.is_empty() || keys.iter().any(String::is_empty) {
            return None;
        }
        Some(Self { namespace, keys })
    }

    /// Key segments joined without the namespace
    pub fn key_path(&self) -> String {
        self.keys.join(PATH_SEPARATOR)
    }

    pub fn is_root(&self) -> bool {
        self.keys.is_empty()
    }

    /// Last key, if this is not a namespace root
    pub fn leaf_key(&self) -> Option<&str> {
        self.keys.last().map(String::as_str)
    }
}

impl fmt::Display for QualifiedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str("<unnamed>")?;
        } else {
            f.write_str(&self.namespace)?;
        }
        for key in &self.keys {
            write!(f, "{}{}", PATH_SEPARATOR, key)?;
        }
        Ok(())
    }
}

/// The target of a reference token, exactly as written between the markers.
///
/// Whether the first segment names a namespace is only decided at resolution
/// time, once every namespace of the build is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceTarget {
    segments: Vec<String>,
}

impl ReferenceTarget {
    /// Parse the text between `[%key:` and `%]`
    pub fn parse(inner: &str) -> Result<Self, String> {
        if inner.is_empty() {
            return Err("reference target is empty".to_string());
        }
        let mut segments = Vec::new();
        for segment in inner.split(PATH_SEPARATOR) {
            if segment.is_empty() {
                return Err(format!("empty path segment in '{}'", inner));
            }
            if let Some(bad) = segment.chars().find(|c| !is_segment_char(*c)) {
                return Err(format!("invalid character '{}' in segment '{}'", bad, segment));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolve the written target to a qualified path.
    ///
    /// `component::<ns>::...` always names `<ns>`. Otherwise the target is
    /// read both ways: with its first segment as the namespace, and relative
    /// to `current`. The namespace reading wins when it `exists`; failing
    /// that, the relative reading wins when it exists. When neither exists the
    /// namespace reading is kept only if that namespace is loaded, so the
    /// dangling path reported is the one the author most likely meant.
    pub fn qualify(
        &self,
        current: &str,
        component_prefix: &str,
        exists: impl Fn(&QualifiedPath) -> bool,
    ) -> QualifiedPath {
        let relative = || QualifiedPath::new(current, self.segments.iter().cloned());
        match self.segments.as_slice() {
            [prefix, namespace, rest @ ..] if prefix.as_str() == component_prefix => {
                QualifiedPath::new(namespace.clone(), rest.iter().cloned())
            }
            [first, rest @ ..] if !rest.is_empty() => {
                let qualified = QualifiedPath::new(first.clone(), rest.iter().cloned());
                if exists(&qualified) {
                    return qualified;
                }
                let relative = relative();
                if exists(&relative) || !exists(&QualifiedPath::root(first.clone())) {
                    relative
                } else {
                    qualified
                }
            }
            _ => relative(),
        }
    }
}

impl fmt::Display for ReferenceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            REFERENCE_OPEN,
            self.segments.join(PATH_SEPARATOR),
            REFERENCE_CLOSE
        )
    }
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified_path() {
        let path = QualifiedPath::parse("waqi::config::error::cannot_connect").unwrap();
        assert_eq!(path.namespace, "waqi");
        assert_eq!(path.keys, vec!["config", "error", "cannot_connect"]);
        assert_eq!(path.to_string(), "waqi::config::error::cannot_connect");
    }

    #[test]
    fn test_parse_rejects_bare_namespace_and_empty_segments() {
        assert!(QualifiedPath::parse("waqi").is_none());
        assert!(QualifiedPath::parse("waqi::").is_none());
        assert!(QualifiedPath::parse("::config").is_none());
        assert!(QualifiedPath::parse("waqi::config::::user").is_none());
    }

    #[test]
    fn test_qualify_known_namespace() {
        let target = ReferenceTarget::parse("common::config_flow::error::cannot_connect").unwrap();
        let path = target.qualify("waqi", "component", |p| p.namespace == "common");
        assert_eq!(path.to_string(), "common::config_flow::error::cannot_connect");
    }

    #[test]
    fn test_qualify_relative_and_component_prefix() {
        let relative = ReferenceTarget::parse("config::step::user::title").unwrap();
        assert_eq!(
            relative.qualify("waqi", "component", |_| false).to_string(),
            "waqi::config::step::user::title"
        );

        let component = ReferenceTarget::parse("component::mqtt::common::payload").unwrap();
        assert_eq!(
            component.qualify("waqi", "component", |_| false).to_string(),
            "mqtt::common::payload"
        );
    }

    #[test]
    fn test_qualify_falls_back_to_relative_when_namespace_path_is_missing() {
        // `config` is also a namespace, but only waqi holds this path
        let target = ReferenceTarget::parse("config::error::cannot_connect").unwrap();
        let exists = |p: &QualifiedPath| {
            p.is_root() || (p.namespace == "waqi" && p.keys.first().map(String::as_str) == Some("config"))
        };
        assert_eq!(
            target.qualify("waqi", "component", exists).to_string(),
            "waqi::config::error::cannot_connect"
        );
    }

    #[test]
    fn test_qualify_prefers_namespace_when_both_exist() {
        let target = ReferenceTarget::parse("config::title").unwrap();
        assert_eq!(
            target.qualify("waqi", "component", |_| true).to_string(),
            "config::title"
        );
    }

    #[test]
    fn test_qualify_dangling_keeps_loaded_namespace_reading() {
        let target = ReferenceTarget::parse("common::missing").unwrap();
        let exists = |p: &QualifiedPath| p.is_root();
        assert_eq!(
            target.qualify("waqi", "component", exists).to_string(),
            "common::missing"
        );
    }

    #[test]
    fn test_reference_target_rejects_bad_segments() {
        assert!(ReferenceTarget::parse("").is_err());
        assert!(ReferenceTarget::parse("common::::x").is_err());
        assert!(ReferenceTarget::parse("common:: x").is_err());
    }
}
