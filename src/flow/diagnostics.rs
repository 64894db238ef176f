//! Flow Diagnostics
//!
//! Advisory findings about flow sections. None of them blocks a build.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::QualifiedPath;

// =============================================================================
// Warning Codes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FlowWarningCode {
    /// Flow has `error`/`abort` messages but no `step` section
    MissingSteps,
    /// `step`, `error` or `abort` is text instead of a group
    MalformedSection,
    /// A step definition is text instead of a group
    MalformedStep,
    /// `title` or `description` of a step is a group
    StepFieldNotText,
    /// `data` or `data_description` is text instead of a group
    DataNotGroup,
    /// A field label under `data` is a group
    DataFieldNotText,
    /// `data_description` describes a field `data` does not declare
    OrphanDataDescription,
    /// Identifier does not match the configured pattern
    InvalidIdentifier,
    /// Two identifiers in one section normalise to the same id
    IdentifierCollision,
    /// Step with nothing to show
    EmptyStep,
    /// An `error`/`abort` message is a group
    MessageNotText,
}

impl FlowWarningCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingSteps => "W101",
            Self::MalformedSection => "W102",
            Self::MalformedStep => "W103",
            Self::StepFieldNotText => "W104",
            Self::DataNotGroup => "W105",
            Self::DataFieldNotText => "W106",
            Self::OrphanDataDescription => "W107",
            Self::InvalidIdentifier => "W108",
            Self::IdentifierCollision => "W109",
            Self::EmptyStep => "W110",
            Self::MessageNotText => "W111",
        }
    }
}

impl fmt::Display for FlowWarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Warning
// =============================================================================

/// One advisory finding in a flow section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSchemaWarning {
    /// Node the finding is about
    pub path: QualifiedPath,
    pub code: FlowWarningCode,
    pub message: String,
    /// Related paths or identifiers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl FlowSchemaWarning {
    pub fn new(path: QualifiedPath, code: FlowWarningCode, message: impl Into<String>) -> Self {
        Self {
            path,
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }
}

impl fmt::Display for FlowSchemaWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] warning: {} ({})", self.code, self.message, self.path)?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Collection
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct FlowWarnings {
    items: Vec<FlowSchemaWarning>,
}

impl FlowWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: FlowSchemaWarning) {
        self.items.push(item);
    }

    pub fn warn(&mut self, path: QualifiedPath, code: FlowWarningCode, message: impl Into<String>) {
        self.push(FlowSchemaWarning::new(path, code, message));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlowSchemaWarning> {
        self.items.iter()
    }

    pub fn count(&self, code: FlowWarningCode) -> usize {
        self.items.iter().filter(|w| w.code == code).count()
    }

    /// Warnings sorted by path, then code
    pub fn into_sorted(mut self) -> Vec<FlowSchemaWarning> {
        self.items
            .sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.code.cmp(&b.code)));
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code_and_context() {
        let warning = FlowSchemaWarning::new(
            QualifiedPath::parse("waqi::config::step::user::data_description::api_key").unwrap(),
            FlowWarningCode::OrphanDataDescription,
            "description for undeclared field 'api_key'",
        )
        .with_context("declared fields: host");

        let rendered = warning.to_string();
        assert!(rendered.starts_with("[W107] warning:"));
        assert!(rendered.contains("waqi::config::step::user::data_description::api_key"));
        assert!(rendered.ends_with("\n  - declared fields: host"));
    }

    #[test]
    fn test_collection_sorts_and_counts() {
        let mut warnings = FlowWarnings::new();
        warnings.warn(QualifiedPath::parse("b::x").unwrap(), FlowWarningCode::EmptyStep, "empty");
        warnings.warn(QualifiedPath::parse("a::x").unwrap(), FlowWarningCode::InvalidIdentifier, "bad");
        warnings.warn(QualifiedPath::parse("a::x").unwrap(), FlowWarningCode::MissingSteps, "none");

        assert_eq!(warnings.count(FlowWarningCode::EmptyStep), 1);
        let sorted = warnings.into_sorted();
        let codes: Vec<&str> = sorted.iter().map(|w| w.code.as_str()).collect();
        assert_eq!(codes, vec!["W101", "W108", "W110"]);
    }
}
