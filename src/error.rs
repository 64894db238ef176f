//! Error types for catalog builds and lookups

use serde::Serialize;
use thiserror::Error;

use crate::flow::FlowSchemaWarning;
use crate::model::QualifiedPath;

/// Result type for whole-catalog builds
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// The structural violation behind a [`SchemaError`]
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaErrorKind {
    #[error("invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("namespace identifier is empty")]
    EmptyNamespace,

    #[error("namespace is defined by more than one document")]
    DuplicateNamespace,

    #[error("document root must be an object, found {found}")]
    RootNotObject { found: &'static str },

    #[error("node must be an object or a string, found {found}")]
    InvalidNodeType { found: &'static str },

    #[error("duplicate key '{key}' in the same object")]
    DuplicateKey { key: String },

    #[error("invalid key '{key}': keys must be non-empty and must not contain '::'")]
    InvalidKey { key: String },

    #[error("malformed reference '{text}': {reason}")]
    MalformedReference { text: String, reason: String },

    #[error("reference points at group {target}, not a leaf")]
    ReferenceToGroup { target: QualifiedPath },
}

/// Malformed input shape at a specific path
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("schema error at {path}: {kind}")]
pub struct SchemaError {
    pub path: QualifiedPath,
    pub kind: SchemaErrorKind,
}

impl SchemaError {
    pub fn new(path: QualifiedPath, kind: SchemaErrorKind) -> Self {
        Self { path, kind }
    }
}

/// A reference chain that revisits one of its own paths
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("reference cycle: {}", render_cycle(.cycle))]
pub struct CycleError {
    /// Every path of the cycle, in reference order
    pub cycle: Vec<QualifiedPath>,
}

fn render_cycle(cycle: &[QualifiedPath]) -> String {
    let mut parts: Vec<String> = cycle.iter().map(ToString::to_string).collect();
    if let Some(first) = cycle.first() {
        parts.push(first.to_string());
    }
    parts.join(" -> ")
}

/// A reference whose target does not exist in any namespace
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{from} references unknown path {target}{}", suggestion_suffix(.suggestion))]
pub struct UnresolvedReferenceError {
    pub from: QualifiedPath,
    pub target: QualifiedPath,
    /// Closest existing leaf path, if any looked plausible
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<QualifiedPath>,
}

fn suggestion_suffix(suggestion: &Option<QualifiedPath>) -> String {
    match suggestion {
        Some(path) => format!(" (did you mean {}?)", path),
        None => String::new(),
    }
}

/// One fatal build-time failure
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum BuildFailure {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error(transparent)]
    Unresolved(#[from] UnresolvedReferenceError),
}

/// A failed build generation. Nothing from it is ever published.
#[derive(Error, Debug, Clone, Serialize)]
#[error("catalog build failed: {} error(s), {} warning(s)", .errors.len(), .warnings.len())]
pub struct BuildError {
    pub errors: Vec<BuildFailure>,
    pub warnings: Vec<FlowSchemaWarning>,
}

impl BuildError {
    pub fn new(errors: Vec<BuildFailure>) -> Self {
        Self {
            errors,
            warnings: Vec::new(),
        }
    }

    pub fn from_schema_errors(errors: Vec<SchemaError>) -> Self {
        Self::new(errors.into_iter().map(BuildFailure::from).collect())
    }

    /// Failure raised by promoting warnings to errors
    pub fn from_warnings(warnings: Vec<FlowSchemaWarning>) -> Self {
        Self {
            errors: Vec::new(),
            warnings,
        }
    }

    pub fn schema_errors(&self) -> impl Iterator<Item = &SchemaError> {
        self.errors.iter().filter_map(|e| match e {
            BuildFailure::Schema(err) => Some(err),
            _ => None,
        })
    }

    pub fn cycles(&self) -> impl Iterator<Item = &CycleError> {
        self.errors.iter().filter_map(|e| match e {
            BuildFailure::Cycle(err) => Some(err),
            _ => None,
        })
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &UnresolvedReferenceError> {
        self.errors.iter().filter_map(|e| match e {
            BuildFailure::Unresolved(err) => Some(err),
            _ => None,
        })
    }
}

/// Lookup of a path the catalog does not hold as a leaf
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown catalog path: {path}")]
pub struct UnknownPathError {
    /// The path as the caller spelled it
    pub path: String,
}

/// A templated leaf was formatted without one of its placeholders
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("missing placeholder '{token}' for {path}")]
pub struct PlaceholderMissingError {
    pub path: QualifiedPath,
    pub token: String,
}

/// Read-time failure of [`crate::Catalog::format`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error(transparent)]
    UnknownPath(#[from] UnknownPathError),

    #[error(transparent)]
    PlaceholderMissing(#[from] PlaceholderMissingError),
}

/// Invalid settings handed to a builder
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Config error: {0}")]
    Load(#[from] config_crate::ConfigError),

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid flow root pattern '{0}'")]
    InvalidFlowRoot(String),
}

/// Document discovery errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("namespace '{namespace}' is defined by both {first} and {second}")]
    ConflictingFiles {
        namespace: String,
        first: String,
        second: String,
    },
}
