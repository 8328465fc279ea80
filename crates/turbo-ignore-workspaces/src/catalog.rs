//! The workspace-discovery document.

use std::{collections::BTreeMap, io::Read};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::Error;

/// One workspace as reported by the discovery step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInfo {
    /// Repository-root-relative directory that the workspace owns.
    pub path: Utf8PathBuf,
    /// Names of other workspaces this one depends on, in declaration order.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Workspace-root-relative globs for paths that never mark this
    /// workspace as affected (generated docs, fixtures, ...).
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// The full discovery document: a mapping from workspace name to metadata.
///
/// ```json
/// {
///   "app": { "path": "packages/app", "dependencies": ["lib"] },
///   "lib": { "path": "packages/lib", "ignore": ["docs/**"] }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceCatalog {
    pub workspaces: BTreeMap<String, WorkspaceInfo>,
}

impl WorkspaceCatalog {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, Error> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_file(path: &Utf8Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn len(&self) -> usize {
        self.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parses_discovery_document() -> Result<(), anyhow::Error> {
        let catalog = WorkspaceCatalog::from_json(
            r#"{
                "app": { "path": "packages/app", "dependencies": ["lib"] },
                "lib": { "path": "packages/lib", "ignore": ["docs/**"] }
            }"#,
        )?;

        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.workspaces["app"],
            WorkspaceInfo {
                path: Utf8PathBuf::from("packages/app"),
                dependencies: vec!["lib".to_string()],
                ignore: vec![],
            }
        );
        assert_eq!(catalog.workspaces["lib"].ignore, vec!["docs/**".to_string()]);
        Ok(())
    }

    #[test]
    fn test_missing_fields_default_to_empty() -> Result<(), anyhow::Error> {
        let catalog = WorkspaceCatalog::from_json(r#"{ "app": { "path": "packages/app" } }"#)?;
        assert!(catalog.workspaces["app"].dependencies.is_empty());
        assert!(catalog.workspaces["app"].ignore.is_empty());
        Ok(())
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let result = WorkspaceCatalog::from_json(r#"{ "app": { "dependencies": [] } }"#);
        assert!(matches!(result, Err(Error::Metadata(_))));
    }
}
