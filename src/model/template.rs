//! Runtime-formatted text
//!
//! A template is split once, at load time, into literal runs and `{name}`
//! placeholders. Only the substitution varies per read.

use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap())
}

/// One run of a parsed template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Text with at least one `{identifier}` placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
    placeholders: BTreeSet<String>,
}

impl Template {
    /// Parse `text`; returns `None` when it has no placeholder span.
    ///
    /// Braces that do not enclose an identifier stay literal.
    pub fn parse(text: &str) -> Option<Self> {
        let mut segments = Vec::new();
        let mut placeholders = BTreeSet::new();
        let mut cursor = 0;

        for captures in placeholder_pattern().captures_iter(text) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if whole.start() > cursor {
                segments.push(Segment::Literal(text[cursor..whole.start()].to_string()));
            }
            segments.push(Segment::Placeholder(name.as_str().to_string()));
            placeholders.insert(name.as_str().to_string());
            cursor = whole.end();
        }

        if placeholders.is_empty() {
            return None;
        }
        if cursor < text.len() {
            segments.push(Segment::Literal(text[cursor..].to_string()));
        }

        Some(Self {
            source: text.to_string(),
            segments,
            placeholders,
        })
    }

    /// The text as written, placeholders included
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Distinct placeholder names
    pub fn placeholders(&self) -> &BTreeSet<String> {
        &self.placeholders
    }

    /// First placeholder, in text order, that has no entry in `values`
    pub fn first_missing<'a>(&'a self, values: &HashMap<String, String>) -> Option<&'a str> {
        self.segments.iter().find_map(|segment| match segment {
            Segment::Placeholder(name) if !values.contains_key(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Substitute every placeholder in a single literal pass.
    ///
    /// Fails with the name of the first missing placeholder before anything
    /// is substituted. Entries that no placeholder uses are ignored.
    pub fn render(&self, values: &HashMap<String, String>) -> Result<String, String> {
        if let Some(missing) = self.first_missing(values) {
            return Err(missing.to_string());
        }

        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    if let Some(value) = values.get(name) {
                        out.push_str(value);
                    }
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_plain_text_is_not_a_template() {
        assert!(Template::parse("Failed to connect").is_none());
        assert!(Template::parse("Use {} or { spaced } braces").is_none());
    }

    #[test]
    fn test_segments_and_placeholders() {
        let template = Template::parse("{host} on port {port}, again {host}").unwrap();
        assert_eq!(
            template.placeholders().iter().collect::<Vec<_>>(),
            vec!["host", "port"]
        );
        assert_eq!(
            template.segments(),
            &[
                Segment::Placeholder("host".into()),
                Segment::Literal(" on port ".into()),
                Segment::Placeholder("port".into()),
                Segment::Literal(", again ".into()),
                Segment::Placeholder("host".into()),
            ]
        );
    }

    #[test]
    fn test_render_substitutes_every_occurrence_once() {
        let template = Template::parse("{a}-{b}-{a}").unwrap();
        let rendered = template.render(&values(&[("a", "{b}"), ("b", "x")])).unwrap();
        // substituted values are never re-scanned
        assert_eq!(rendered, "{b}-x-{b}");
    }

    #[test]
    fn test_render_reports_first_missing_in_text_order() {
        let template = Template::parse("{zeta} then {alpha}").unwrap();
        assert_eq!(template.render(&HashMap::new()), Err("zeta".to_string()));
        assert_eq!(
            template.render(&values(&[("zeta", "z")])),
            Err("alpha".to_string())
        );
    }

    #[test]
    fn test_render_ignores_extra_values() {
        let template = Template::parse("The currency {currency} is no longer in use").unwrap();
        let rendered = template
            .render(&values(&[("currency", "USD"), ("unused", "x")]))
            .unwrap();
        assert_eq!(rendered, "The currency USD is no longer in use");
    }
}
