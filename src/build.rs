//! Catalog Builds
//!
//! One build generation: Loader, then Resolver, then Flow Validator, end to
//! end. Either a complete catalog comes out or a [`BuildError`] listing every
//! fatal failure; nothing partial is ever returned.

use crate::catalog::Catalog;
use crate::config::{CatalogConfig, LoaderConfig, ResolverConfig};
use crate::error::{BuildError, BuildResult, ConfigurationError};
use crate::flow::{FlowSchemaWarning, FlowValidator};
use crate::graph::ReferenceGraph;
use crate::loader::{load_forest, Forest, NamespaceDocument};
use crate::resolver::resolve_forest;

/// A successful build
#[derive(Debug, Clone)]
pub struct ResolvedBuild {
    pub catalog: Catalog,
    /// Reference edges discovered during resolution
    pub graph: ReferenceGraph,
    /// Advisory flow findings; never fatal unless configured so
    pub warnings: Vec<FlowSchemaWarning>,
}

/// Build phases, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Load,
    Resolve,
    Validate,
}

#[derive(Default)]
pub struct CatalogBuilder {
    loader: LoaderConfig,
    resolver: ResolverConfig,
    validator: FlowValidator,
    warnings_as_errors: bool,
}

impl CatalogBuilder {
    pub fn new(config: &CatalogConfig) -> Result<Self, ConfigurationError> {
        Ok(Self {
            loader: config.loader.clone(),
            resolver: config.resolver.clone(),
            validator: FlowValidator::new(&config.flows)?,
            warnings_as_errors: config.validation.warnings_as_errors,
        })
    }

    pub fn warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    /// Run a full build generation
    pub fn build(&self, documents: &[NamespaceDocument]) -> BuildResult<ResolvedBuild> {
        let forest = self.load_phase(documents)?;
        let (catalog, graph) = self.resolve_phase(&forest)?;
        self.validate_phase(catalog, graph)
    }

    /// Run a build, asking `abandon` before each phase whether to give up.
    ///
    /// Returns `Ok(None)` when abandoned; nothing is retained from the
    /// partial work.
    pub fn build_until(
        &self,
        documents: &[NamespaceDocument],
        abandon: impl Fn(BuildPhase) -> bool,
    ) -> BuildResult<Option<ResolvedBuild>> {
        if abandon(BuildPhase::Load) {
            return Ok(None);
        }
        let forest = self.load_phase(documents)?;

        if abandon(BuildPhase::Resolve) {
            return Ok(None);
        }
        let (catalog, graph) = self.resolve_phase(&forest)?;

        if abandon(BuildPhase::Validate) {
            return Ok(None);
        }
        self.validate_phase(catalog, graph).map(Some)
    }

    fn load_phase(&self, documents: &[NamespaceDocument]) -> BuildResult<Forest> {
        load_forest(documents, &self.loader).map_err(BuildError::from_schema_errors)
    }

    fn resolve_phase(&self, forest: &Forest) -> BuildResult<(Catalog, ReferenceGraph)> {
        resolve_forest(forest, &self.resolver).map_err(BuildError::new)
    }

    fn validate_phase(&self, catalog: Catalog, graph: ReferenceGraph) -> BuildResult<ResolvedBuild> {
        let warnings = self.validator.validate(&catalog);
        for warning in &warnings {
            tracing::warn!(code = %warning.code, path = %warning.path, "{}", warning.message);
        }
        if self.warnings_as_errors && !warnings.is_empty() {
            return Err(BuildError::from_warnings(warnings));
        }

        Ok(ResolvedBuild {
            catalog,
            graph,
            warnings,
        })
    }
}

/// Build a catalog from `documents` with default settings
pub fn resolve(documents: &[NamespaceDocument]) -> BuildResult<ResolvedBuild> {
    CatalogBuilder::default().build(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn docs() -> Vec<NamespaceDocument> {
        vec![
            NamespaceDocument::from_text("common", r#"{ "config_flow": { "abort": { "already_configured": "Already configured" } } }"#),
            NamespaceDocument::from_text(
                "demo",
                r#"{ "config": { "step": { "user": {} }, "abort": { "already_configured": "[%key:common::config_flow::abort::already_configured%]" } } }"#,
            ),
        ]
    }

    #[test]
    fn test_build_collects_warnings() {
        let build = resolve(&docs()).unwrap();
        assert_eq!(build.warnings.len(), 1);
        assert_eq!(
            build.catalog.lookup("demo::config::abort::already_configured").unwrap().as_str(),
            "Already configured"
        );
    }

    #[test]
    fn test_warnings_as_errors_fails_build() {
        let err = CatalogBuilder::default()
            .warnings_as_errors(true)
            .build(&docs())
            .unwrap_err();
        assert!(err.errors.is_empty());
        assert_eq!(err.warnings.len(), 1);
    }

    #[test]
    fn test_schema_errors_stop_before_resolution() {
        let docs = vec![
            NamespaceDocument::from_text("a", r#"{ "x": "[%key:missing%]", "y": "1", "y": "2" }"#),
        ];
        let err = resolve(&docs).unwrap_err();
        // the dangling reference is never reached
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.schema_errors().count(), 1);
        assert_eq!(err.unresolved().count(), 0);
    }

    #[test]
    fn test_build_matches_unabandoned_build_until() {
        let builder = CatalogBuilder::default();
        let full = builder.build(&docs()).unwrap();
        let checked = builder.build_until(&docs(), |_| false).unwrap().unwrap();
        assert_eq!(full.catalog, checked.catalog);
        assert_eq!(full.warnings, checked.warnings);
    }

    #[test]
    fn test_abandoned_build_stops_at_phase() {
        let seen = RefCell::new(Vec::new());
        let outcome = CatalogBuilder::default()
            .build_until(&docs(), |phase| {
                seen.borrow_mut().push(phase);
                phase == BuildPhase::Resolve
            })
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(*seen.borrow(), vec![BuildPhase::Load, BuildPhase::Resolve]);
    }
}
