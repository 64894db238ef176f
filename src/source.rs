//! Document discovery
//!
//! Walks a source directory and turns every JSON file into a
//! [`NamespaceDocument`]. A file named like `SourceConfig::document_name`
//! (`strings.json` by default) takes its namespace from its parent
//! directory; any other `.json` file takes the namespace from its stem.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::loader::NamespaceDocument;

/// Discover namespace documents under `dir`, sorted by namespace
pub fn discover_documents(
    dir: &Path,
    config: &SourceConfig,
) -> Result<Vec<NamespaceDocument>, SourceError> {
    let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }

        let relative = path.strip_prefix(dir).unwrap_or(path);
        let relative_str = relative.to_string_lossy().replace('\\', "/");
        if config.skip_prefixes.iter().any(|p| relative_str.starts_with(p.as_str())) {
            tracing::trace!(path = %relative_str, "skipping document");
            continue;
        }

        let Some(namespace) = namespace_for(relative, &config.document_name) else {
            tracing::debug!(path = %relative_str, "no namespace for document");
            continue;
        };

        if let Some(first) = found.get(&namespace) {
            return Err(SourceError::ConflictingFiles {
                namespace,
                first: first.display().to_string(),
                second: path.display().to_string(),
            });
        }
        found.insert(namespace, path.to_path_buf());
    }

    let mut documents = Vec::with_capacity(found.len());
    for (namespace, path) in found {
        let text = fs::read_to_string(&path)?;
        documents.push(NamespaceDocument::from_text(namespace, text));
    }

    tracing::info!(dir = %dir.display(), documents = documents.len(), "discovered namespace documents");
    Ok(documents)
}

fn namespace_for(relative: &Path, document_name: &str) -> Option<String> {
    let file_name = relative.file_name()?.to_str()?;
    if file_name == document_name {
        let parent = relative.parent()?.file_name()?.to_str()?;
        return Some(parent.to_string());
    }
    relative.file_stem()?.to_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, body: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn test_discovers_component_and_flat_documents() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "waqi/strings.json", r#"{"title": "WAQI"}"#);
        write(dir.path(), "common.json", r#"{"state": {"on": "On"}}"#);
        write(dir.path(), "waqi/notes.txt", "ignored");

        let docs = discover_documents(dir.path(), &SourceConfig::default()).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.namespace.as_str()).collect();
        assert_eq!(names, vec!["common", "waqi"]);
    }

    #[test]
    fn test_skip_prefixes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "waqi/strings.json", "{}");
        write(dir.path(), "translations/en.json", "{}");

        let docs = discover_documents(dir.path(), &SourceConfig::default()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].namespace, "waqi");
    }

    #[test]
    fn test_conflicting_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "waqi/strings.json", "{}");
        write(dir.path(), "waqi.json", "{}");

        let err = discover_documents(dir.path(), &SourceConfig::default()).unwrap_err();
        assert!(matches!(err, SourceError::ConflictingFiles { ref namespace, .. } if namespace == "waqi"));
    }
}
