//! Flow Schema Validation
//!
//! Inspects the resolved catalog for the sub-shapes that carry multi-step
//! wizard prompts: a flow root holding `step`, `error` and `abort` groups,
//! each step holding optional `title`, `description` and a `data` group of
//! field labels. Only shape and identifiers are checked; transitions belong
//! to the flow engine.
//!
//! All findings are advisory [`FlowSchemaWarning`]s.
//!
//! Identifiers are checked within one section at a time. Error and abort
//! ids shared with each other or with step ids are not reported: flows
//! routinely reuse ids such as `cannot_connect` in both `error` and
//! `abort`, and steps name the errors they raise only in free text.

pub mod diagnostics;

pub use diagnostics::{FlowSchemaWarning, FlowWarningCode, FlowWarnings};

use regex::Regex;
use std::collections::{BTreeSet, HashMap};

use crate::catalog::Catalog;
use crate::config::{default_flow_roots, default_identifier_pattern, FlowConfig};
use crate::error::ConfigurationError;
use crate::model::{Group, Node, QualifiedPath, ResolvedText};

const STEP: &str = "step";
const ERROR: &str = "error";
const ABORT: &str = "abort";
const DATA: &str = "data";
const DATA_DESCRIPTION: &str = "data_description";

/// Step keys that make a step non-empty
const STEP_CONTENT: [&str; 4] = ["title", "description", DATA, "menu_options"];

pub struct FlowValidator {
    /// Root patterns split on `.`; `*` matches any key
    roots: Vec<Vec<String>>,
    identifier: Regex,
}

impl Default for FlowValidator {
    fn default() -> Self {
        Self {
            roots: default_flow_roots()
                .iter()
                .filter_map(|r| parse_root(r))
                .collect(),
            identifier: Regex::new(&default_identifier_pattern()).unwrap(),
        }
    }
}

fn parse_root(pattern: &str) -> Option<Vec<String>> {
    let segments: Vec<String> = pattern.split('.').map(str::to_string).collect();
    if segments.iter().any(String::is_empty) {
        return None;
    }
    Some(segments)
}

impl FlowValidator {
    pub fn new(config: &FlowConfig) -> Result<Self, ConfigurationError> {
        let roots = config
            .roots
            .iter()
            .map(|r| parse_root(r).ok_or_else(|| ConfigurationError::InvalidFlowRoot(r.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        let identifier = Regex::new(&config.identifier_pattern).map_err(|source| {
            ConfigurationError::InvalidPattern {
                pattern: config.identifier_pattern.clone(),
                source,
            }
        })?;
        Ok(Self { roots, identifier })
    }

    /// Check every flow section of every namespace
    pub fn validate(&self, catalog: &Catalog) -> Vec<FlowSchemaWarning> {
        let mut warnings = FlowWarnings::new();
        let mut sections = 0usize;

        for id in catalog.namespaces() {
            let Some(root) = catalog.namespace(id) else {
                continue;
            };
            let mut found = Vec::new();
            for pattern in &self.roots {
                find_roots(root, pattern, QualifiedPath::root(id), &mut found);
            }
            for (path, group) in found {
                if self.check_flow(&path, group, &mut warnings) {
                    sections += 1;
                }
            }
        }

        tracing::debug!(sections, warnings = warnings.len(), "validated flow sections");
        warnings.into_sorted()
    }

    /// Returns false when `flow` is not flow-shaped and was skipped
    fn check_flow(
        &self,
        path: &QualifiedPath,
        flow: &Group<ResolvedText>,
        warnings: &mut FlowWarnings,
    ) -> bool {
        if ![STEP, ERROR, ABORT].iter().any(|k| flow.contains_key(*k)) {
            return false;
        }

        match flow.get(STEP) {
            None => warnings.warn(
                path.clone(),
                FlowWarningCode::MissingSteps,
                "flow declares error or abort messages but no steps",
            ),
            Some(Node::Leaf(_)) => warnings.warn(
                path.child(STEP),
                FlowWarningCode::MalformedSection,
                "'step' must be a group of step definitions",
            ),
            Some(Node::Group(steps)) => {
                let steps_path = path.child(STEP);
                self.check_identifiers(&steps_path, steps.keys(), warnings);
                for (id, step) in steps {
                    match step {
                        Node::Leaf(_) => warnings.warn(
                            steps_path.child(id),
                            FlowWarningCode::MalformedStep,
                            format!("step '{}' must be a group", id),
                        ),
                        Node::Group(step) => self.check_step(&steps_path.child(id), step, warnings),
                    }
                }
            }
        }

        for section in [ERROR, ABORT] {
            match flow.get(section) {
                None => {}
                Some(Node::Leaf(_)) => warnings.warn(
                    path.child(section),
                    FlowWarningCode::MalformedSection,
                    format!("'{}' must be a group of messages", section),
                ),
                Some(Node::Group(messages)) => {
                    let section_path = path.child(section);
                    self.check_identifiers(&section_path, messages.keys(), warnings);
                    for (id, message) in messages {
                        if !message.is_leaf() {
                            warnings.warn(
                                section_path.child(id),
                                FlowWarningCode::MessageNotText,
                                format!("{} message '{}' must be text", section, id),
                            );
                        }
                    }
                }
            }
        }

        true
    }

    fn check_step(
        &self,
        path: &QualifiedPath,
        step: &Group<ResolvedText>,
        warnings: &mut FlowWarnings,
    ) {
        if !STEP_CONTENT.iter().any(|k| step.contains_key(*k)) {
            warnings.warn(
                path.clone(),
                FlowWarningCode::EmptyStep,
                "step has no title, description, data or menu options",
            );
        }

        for field in ["title", "description"] {
            if let Some(Node::Group(_)) = step.get(field) {
                warnings.warn(
                    path.child(field),
                    FlowWarningCode::StepFieldNotText,
                    format!("step {} must be text", field),
                );
            }
        }

        let mut declared: BTreeSet<&str> = BTreeSet::new();
        match step.get(DATA) {
            None => {}
            Some(Node::Leaf(_)) => warnings.warn(
                path.child(DATA),
                FlowWarningCode::DataNotGroup,
                "'data' must be a group of field labels",
            ),
            Some(Node::Group(fields)) => {
                let data_path = path.child(DATA);
                self.check_identifiers(&data_path, fields.keys(), warnings);
                for (id, label) in fields {
                    declared.insert(id.as_str());
                    if !label.is_leaf() {
                        warnings.warn(
                            data_path.child(id),
                            FlowWarningCode::DataFieldNotText,
                            format!("label of field '{}' must be text", id),
                        );
                    }
                }
            }
        }

        match step.get(DATA_DESCRIPTION) {
            None => {}
            Some(Node::Leaf(_)) => warnings.warn(
                path.child(DATA_DESCRIPTION),
                FlowWarningCode::DataNotGroup,
                "'data_description' must be a group of field descriptions",
            ),
            Some(Node::Group(descriptions)) => {
                let described_path = path.child(DATA_DESCRIPTION);
                for id in descriptions.keys() {
                    if declared.contains(id.as_str()) {
                        continue;
                    }
                    let mut warning = FlowSchemaWarning::new(
                        described_path.child(id),
                        FlowWarningCode::OrphanDataDescription,
                        format!("description for undeclared field '{}'", id),
                    );
                    if !declared.is_empty() {
                        let fields: Vec<&str> = declared.iter().copied().collect();
                        warning = warning.with_context(format!("declared fields: {}", fields.join(", ")));
                    }
                    warnings.push(warning);
                }
            }
        }
    }

    /// Pattern and collision checks over one section's keys
    fn check_identifiers<'a>(
        &self,
        section: &QualifiedPath,
        ids: impl Iterator<Item = &'a String>,
        warnings: &mut FlowWarnings,
    ) {
        let mut normalized: HashMap<String, &str> = HashMap::new();
        for id in ids {
            if !self.identifier.is_match(id) {
                warnings.warn(
                    section.child(id),
                    FlowWarningCode::InvalidIdentifier,
                    format!("identifier '{}' does not match {}", id, self.identifier.as_str()),
                );
            }
            let key = normalize_identifier(id);
            match normalized.get(&key) {
                Some(first) => warnings.push(
                    FlowSchemaWarning::new(
                        section.child(id),
                        FlowWarningCode::IdentifierCollision,
                        format!("identifier '{}' collides with '{}'", id, first),
                    )
                    .with_context(format!("both normalise to '{}'", key)),
                ),
                None => {
                    normalized.insert(key, id.as_str());
                }
            }
        }
    }
}

fn normalize_identifier(id: &str) -> String {
    id.to_lowercase().replace('-', "_")
}

/// Collect every group below `node` matching `pattern`
fn find_roots<'c>(
    node: &'c Node<ResolvedText>,
    pattern: &[String],
    path: QualifiedPath,
    out: &mut Vec<(QualifiedPath, &'c Group<ResolvedText>)>,
) {
    let Some(group) = node.as_group() else {
        return;
    };
    let Some((head, rest)) = pattern.split_first() else {
        out.push((path, group));
        return;
    };

    if head == "*" {
        for (key, child) in group {
            find_roots(child, rest, path.child(key), out);
        }
    } else if let Some(child) = group.get(head) {
        find_roots(child, rest, path.child(head), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::loader::{load_forest, NamespaceDocument};
    use crate::resolver::resolve_forest;

    fn warnings_for(text: &str) -> Vec<FlowSchemaWarning> {
        let docs = vec![NamespaceDocument::from_text("demo", text)];
        let forest = load_forest(&docs, &Default::default()).unwrap();
        let (catalog, _) = resolve_forest(&forest, &ResolverConfig::default()).unwrap();
        FlowValidator::default().validate(&catalog)
    }

    fn codes(warnings: &[FlowSchemaWarning]) -> Vec<(String, FlowWarningCode)> {
        warnings
            .iter()
            .map(|w| (w.path.to_string(), w.code))
            .collect()
    }

    #[test]
    fn test_well_formed_flow_has_no_warnings() {
        let warnings = warnings_for(
            r#"{
                "config": {
                    "step": {
                        "user": {
                            "title": "Connect",
                            "data": { "host": "Host", "api_key": "API key" },
                            "data_description": { "host": "The hostname of {name}" }
                        }
                    },
                    "error": { "cannot_connect": "Failed to connect" },
                    "abort": { "already_configured": "Already configured" }
                },
                "entity": { "sensor": { "aqi": { "name": "AQI" } } }
            }"#,
        );
        assert!(warnings.is_empty(), "{:?}", warnings);
    }

    #[test]
    fn test_ids_shared_across_sections_are_not_reported() {
        let warnings = warnings_for(
            r#"{
                "config": {
                    "step": { "cannot_connect": { "title": "Retry" } },
                    "error": { "cannot_connect": "Failed to connect" },
                    "abort": { "cannot_connect": "Failed to connect" }
                }
            }"#,
        );
        assert!(warnings.is_empty(), "{:?}", warnings);
    }

    #[test]
    fn test_step_shape_warnings() {
        let warnings = warnings_for(
            r#"{
                "config": {
                    "step": {
                        "user": { "title": { "nested": "x" }, "data": { "host": { "deep": "x" } } },
                        "reauth": "not a group",
                        "blank": {},
                        "confirm": { "data": "x", "data_description": { "port": "Port" } }
                    }
                }
            }"#,
        );
        assert_eq!(
            codes(&warnings),
            vec![
                ("demo::config::step::blank".to_string(), FlowWarningCode::EmptyStep),
                ("demo::config::step::confirm::data".to_string(), FlowWarningCode::DataNotGroup),
                (
                    "demo::config::step::confirm::data_description::port".to_string(),
                    FlowWarningCode::OrphanDataDescription
                ),
                ("demo::config::step::reauth".to_string(), FlowWarningCode::MalformedStep),
                (
                    "demo::config::step::user::data::host".to_string(),
                    FlowWarningCode::DataFieldNotText
                ),
                ("demo::config::step::user::title".to_string(), FlowWarningCode::StepFieldNotText),
            ]
        );
    }

    #[test]
    fn test_identifier_pattern_and_collisions() {
        let warnings = warnings_for(
            r#"{
                "options": {
                    "step": { "init": { "title": "Options" } },
                    "error": { "Cannot-Connect": "a", "cannot_connect": "b" }
                }
            }"#,
        );
        assert_eq!(
            codes(&warnings),
            vec![
                (
                    "demo::options::error::Cannot-Connect".to_string(),
                    FlowWarningCode::InvalidIdentifier
                ),
                (
                    "demo::options::error::cannot_connect".to_string(),
                    FlowWarningCode::IdentifierCollision
                ),
            ]
        );
    }

    #[test]
    fn test_repair_flows_and_missing_steps() {
        let warnings = warnings_for(
            r#"{
                "issues": {
                    "deprecated_yaml": { "title": "YAML is deprecated" },
                    "broken": {
                        "title": "Broken",
                        "fix_flow": { "abort": { "not_fixable": "Cannot fix" } }
                    },
                    "ok": {
                        "title": "Fixable",
                        "fix_flow": { "step": { "confirm": { "title": "Fix {item}" } } }
                    }
                },
                "config": { "flow_title": "not a flow section" }
            }"#,
        );
        assert_eq!(
            codes(&warnings),
            vec![(
                "demo::issues::broken::fix_flow".to_string(),
                FlowWarningCode::MissingSteps
            )]
        );
    }

    #[test]
    fn test_malformed_sections_and_message_groups() {
        let warnings = warnings_for(
            r#"{
                "config": {
                    "step": "x",
                    "error": { "nested": { "too": "deep" } },
                    "abort": "y"
                }
            }"#,
        );
        assert_eq!(
            codes(&warnings),
            vec![
                ("demo::config::abort".to_string(), FlowWarningCode::MalformedSection),
                ("demo::config::error::nested".to_string(), FlowWarningCode::MessageNotText),
                ("demo::config::step".to_string(), FlowWarningCode::MalformedSection),
            ]
        );
    }

    #[test]
    fn test_invalid_configuration() {
        let bad_root = FlowConfig {
            roots: vec!["issues..fix_flow".into()],
            ..FlowConfig::default()
        };
        assert!(matches!(
            FlowValidator::new(&bad_root),
            Err(ConfigurationError::InvalidFlowRoot(_))
        ));

        let bad_pattern = FlowConfig {
            identifier_pattern: "([".into(),
            ..FlowConfig::default()
        };
        assert!(matches!(
            FlowValidator::new(&bad_pattern),
            Err(ConfigurationError::InvalidPattern { .. })
        ));
    }
}
