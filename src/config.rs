//! Configuration management for catalog builds
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (catalog.toml)
//! - Environment variables (CATALOG__*)
//!
//! ## Example config file (catalog.toml):
//! ```toml
//! [source]
//! dir = "./homeassistant/components"
//! document_name = "strings.json"
//!
//! [loader]
//! parallel_threshold = 32
//!
//! [resolver]
//! component_prefix = "component"
//!
//! [flows]
//! roots = ["config", "options", "config_subentries.*", "issues.*.fix_flow"]
//! identifier_pattern = "^[a-z0-9_]+$"
//!
//! [validation]
//! warnings_as_errors = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for catalog builds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Document discovery settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Loader settings
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Reference resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Flow section recognition
    #[serde(default)]
    pub flows: FlowConfig,

    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Where and how namespace documents are discovered on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root directory to scan
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// A file with this name takes its namespace from the parent directory
    #[serde(default = "default_document_name")]
    pub document_name: String,

    /// Skip files whose relative path starts with one of these prefixes
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,
}

/// Loader configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Load namespaces on worker threads once this many documents are supplied
    /// (0 disables parallel loading)
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Leading reference segment that introduces an explicit namespace:
    /// `[%key:component::<namespace>::...%]`
    #[serde(default = "default_component_prefix")]
    pub component_prefix: String,

    /// Offer a "did you mean" path on dangling references
    #[serde(default = "default_true")]
    pub suggest_targets: bool,
}

/// Flow section recognition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Dotted key patterns of flow roots; `*` matches any single key
    #[serde(default = "default_flow_roots")]
    pub roots: Vec<String>,

    /// Pattern every step, error, abort and field identifier should match
    #[serde(default = "default_identifier_pattern")]
    pub identifier_pattern: String,
}

/// Validation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Fail the build when the flow validator reports any warning
    #[serde(default)]
    pub warnings_as_errors: bool,
}

// Default value functions
fn default_document_name() -> String {
    "strings.json".to_string()
}

fn default_skip_prefixes() -> Vec<String> {
    vec![
        "target/".to_string(),
        ".git/".to_string(),
        "node_modules/".to_string(),
        "translations/".to_string(),
    ]
}

fn default_parallel_threshold() -> usize {
    32
}

fn default_component_prefix() -> String {
    "component".to_string()
}

fn default_true() -> bool {
    true
}

pub(crate) fn default_flow_roots() -> Vec<String> {
    vec![
        "config".to_string(),
        "options".to_string(),
        "config_subentries.*".to_string(),
        "issues.*.fix_flow".to_string(),
    ]
}

pub(crate) fn default_identifier_pattern() -> String {
    "^[a-z0-9_]+$".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: None,
            document_name: default_document_name(),
            skip_prefixes: default_skip_prefixes(),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            component_prefix: default_component_prefix(),
            suggest_targets: true,
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            roots: default_flow_roots(),
            identifier_pattern: default_identifier_pattern(),
        }
    }
}

impl CatalogConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["catalog.toml", ".catalog.toml", "config/catalog.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "string-catalog") {
            let xdg_config = config_dir.config_dir().join("catalog.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // CATALOG__RESOLVER__COMPONENT_PREFIX=... style overrides
        builder = builder.add_source(
            Environment::with_prefix("CATALOG")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> std::io::Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Source directory, resolving relative paths against the working directory
    pub fn source_dir(&self) -> Option<PathBuf> {
        self.source.dir.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                std::env::current_dir().unwrap_or_default().join(p)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CatalogConfig::default();
        assert_eq!(config.resolver.component_prefix, "component");
        assert_eq!(config.flows.roots.len(), 4);
        assert!(!config.validation.warnings_as_errors);
        assert_eq!(config.source.document_name, "strings.json");
    }

    #[test]
    fn test_serialize_config() {
        let config = CatalogConfig::default();
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("[resolver]"));
        assert!(toml_str.contains("[flows]"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: CatalogConfig = toml::from_str(
            r#"
            [validation]
            warnings_as_errors = true

            [flows]
            roots = ["config"]
            "#,
        )
        .unwrap();
        assert!(config.validation.warnings_as_errors);
        assert_eq!(config.flows.roots, vec!["config"]);
        assert_eq!(config.flows.identifier_pattern, "^[a-z0-9_]+$");
        assert_eq!(config.loader.parallel_threshold, 32);
    }
}
