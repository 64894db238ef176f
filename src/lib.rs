//! String Catalog
//!
//! Builds a resolved localization catalog from nested, cross-referencing
//! namespace documents, the way integration string files reference shared
//! phrases with `[%key:...%]` tokens.
//!
//! ## Features
//!
//! - **Reference Resolution**: References are followed transitively across namespaces
//! - **Cycle Detection**: Every reference cycle is reported once, never looped on
//! - **Flow Validation**: Advisory checks over config/options flow sections
//! - **Placeholder Formatting**: `{name}` placeholders are filled at lookup time
//! - **Atomic Publication**: Readers always see one complete generation
//!
//! ## Pipeline
//!
//! ```text
//! documents
//!   └─ loader    (parse, duplicate keys, malformed references)
//!       └─ resolver  (follow references, cycles, dangling targets)
//!           └─ flow      (advisory warnings)
//!               └─ catalog   (immutable snapshot, published by the store)
//! ```

pub mod build;
pub mod catalog;
pub mod checksum;
pub mod config;
pub mod error;
pub mod flow;
pub mod graph;
pub mod loader;
pub mod model;
pub mod resolver;
pub mod source;
pub mod store;

pub use build::{resolve, BuildPhase, CatalogBuilder, ResolvedBuild};
pub use catalog::Catalog;
pub use checksum::Checksum;
pub use config::CatalogConfig;
pub use error::{
    BuildError, BuildFailure, BuildResult, CycleError, FormatError, PlaceholderMissingError,
    SchemaError, SchemaErrorKind, UnknownPathError, UnresolvedReferenceError,
};
pub use flow::{FlowSchemaWarning, FlowValidator, FlowWarningCode};
pub use graph::ReferenceGraph;
pub use loader::NamespaceDocument;
pub use model::{QualifiedPath, ResolvedText};
pub use source::discover_documents;
pub use store::{CatalogStore, PublishOutcome, Snapshot};
