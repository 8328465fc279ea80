//! Maps changed paths to the workspaces they affect.
//!
//! Paths outside every workspace land in the root bucket, which marks all
//! workspaces as affected unless a global ignore covers them. Manifest and
//! lockfile changes can never be ignored; a dependency-version bump must
//! never be silently skipped.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use turbo_ignore_scm::ChangeSet;
use turbo_ignore_workspaces::{DependencyGraph, WorkspaceName};
use wax::Pattern;

/// Changed paths bucketed by the workspace that owns them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    buckets: BTreeMap<WorkspaceName, BTreeSet<Utf8PathBuf>>,
    manifests: BTreeSet<Utf8PathBuf>,
}

impl Classification {
    /// The paths that directly hit `workspace`, if any did. Buckets are
    /// only ever created non-empty.
    pub fn matched(&self, workspace: &WorkspaceName) -> Option<&BTreeSet<Utf8PathBuf>> {
        self.buckets.get(workspace)
    }

    /// Paths owned by no workspace. Any of these affects everything.
    pub fn root_paths(&self) -> Option<&BTreeSet<Utf8PathBuf>> {
        self.buckets.get(&WorkspaceName::Root)
    }

    pub fn is_manifest(&self, path: &Utf8Path) -> bool {
        self.manifests.contains(path)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn insert(&mut self, workspace: WorkspaceName, path: &Utf8Path, manifest: bool) {
        self.buckets
            .entry(workspace)
            .or_default()
            .insert(path.to_owned());
        if manifest {
            self.manifests.insert(path.to_owned());
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid ignore glob: {0}")]
    InvalidGlob(String),
}

pub struct ChangeMapper<'a> {
    graph: &'a DependencyGraph,
    global_ignore: &'a [String],
    manifest_names: BTreeSet<&'a str>,
}

impl<'a> ChangeMapper<'a> {
    pub fn new(
        graph: &'a DependencyGraph,
        global_ignore: &'a [String],
        manifest_names: &'a [String],
    ) -> Self {
        Self {
            graph,
            global_ignore,
            manifest_names: manifest_names.iter().map(String::as_str).collect(),
        }
    }

    pub fn classify(&self, changes: &ChangeSet) -> Result<Classification, Error> {
        let global_matcher = build_matcher(self.global_ignore.iter().map(String::as_str))?;

        let mut workspace_matchers: HashMap<&WorkspaceName, wax::Any<'a>> = HashMap::new();
        for (name, entry) in self.graph.workspaces() {
            if !entry.ignore().is_empty() {
                workspace_matchers
                    .insert(name, build_matcher(entry.ignore().iter().map(String::as_str))?);
            }
        }

        let mut classification = Classification::default();
        for path in changes.paths() {
            let manifest = self.is_manifest(path);
            match self.graph.workspace_for_path(path) {
                Some(workspace) => {
                    let entry = self
                        .graph
                        .workspace(workspace)
                        .expect("classified workspace is in the graph");
                    // ignore globs are workspace-root-relative
                    let relative = path.strip_prefix(entry.root()).unwrap_or(path);
                    let ignored = !manifest
                        && workspace_matchers
                            .get(workspace)
                            .is_some_and(|matcher| matcher.is_match(relative.as_str()));
                    if !ignored {
                        classification.insert(workspace.clone(), path, manifest);
                    }
                }
                None => {
                    let ignored = !manifest && global_matcher.is_match(path.as_str());
                    if !ignored {
                        classification.insert(WorkspaceName::Root, path, manifest);
                    }
                }
            }
        }

        Ok(classification)
    }

    fn is_manifest(&self, path: &Utf8Path) -> bool {
        path.file_name()
            .is_some_and(|name| self.manifest_names.contains(name))
    }
}

fn build_matcher<'t>(patterns: impl Iterator<Item = &'t str>) -> Result<wax::Any<'t>, Error> {
    wax::any(patterns).map_err(|error| Error::InvalidGlob(error.to_string()))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use test_case::test_case;
    use turbo_ignore_scm::{ChangeSet, Provenance};
    use turbo_ignore_workspaces::WorkspaceCatalog;

    use super::*;
    use crate::cli::DEFAULT_MANIFESTS;

    fn graph() -> DependencyGraph {
        DependencyGraph::build(
            &WorkspaceCatalog::from_json(
                r#"{
                    "app": { "path": "packages/app", "dependencies": ["lib"] },
                    "lib": { "path": "packages/lib", "ignore": ["docs/**", "fixtures/**"] },
                    "other": { "path": "packages/other" }
                }"#,
            )
            .unwrap(),
        )
        .unwrap()
    }

    fn change_set(paths: &[&str]) -> ChangeSet {
        let mut changes = ChangeSet::new(Provenance::DiffRange);
        for path in paths {
            changes.insert(path).unwrap();
        }
        changes
    }

    fn manifests() -> Vec<String> {
        DEFAULT_MANIFESTS.iter().map(|name| name.to_string()).collect()
    }

    fn classify(paths: &[&str], global_ignore: &[&str]) -> Classification {
        let graph = graph();
        let global_ignore: Vec<String> =
            global_ignore.iter().map(|glob| glob.to_string()).collect();
        let manifest_names = manifests();
        let mapper = ChangeMapper::new(&graph, &global_ignore, &manifest_names);
        mapper.classify(&change_set(paths)).unwrap()
    }

    fn bucket(classification: &Classification, workspace: &str) -> Vec<String> {
        classification
            .matched(&WorkspaceName::from(workspace))
            .map(|paths| paths.iter().map(|path| path.to_string()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_paths_land_in_their_workspace() {
        let classification = classify(
            &["packages/app/src/index.ts", "packages/lib/src/util.ts"],
            &[],
        );
        assert_eq!(bucket(&classification, "app"), vec!["packages/app/src/index.ts"]);
        assert_eq!(bucket(&classification, "lib"), vec!["packages/lib/src/util.ts"]);
        assert!(classification.root_paths().is_none());
    }

    #[test]
    fn test_unowned_paths_land_in_the_root_bucket() {
        let classification = classify(&["tooling/ci.sh"], &[]);
        let root = classification.root_paths().expect("root bucket");
        assert_eq!(root.len(), 1);
        assert!(classification.matched(&WorkspaceName::from("app")).is_none());
    }

    #[test_case(&["packages/lib/docs/api.md"] ; "single ignored doc")]
    #[test_case(&["packages/lib/fixtures/big.json", "packages/lib/docs/guide.md"] ; "multiple ignore globs")]
    fn test_workspace_ignore_globs_drop_paths(paths: &[&str]) {
        let classification = classify(paths, &[]);
        assert!(classification.is_empty());
    }

    #[test]
    fn test_ignored_manifest_is_kept() {
        // a lockfile inside an ignored tree still counts
        let classification = classify(&["packages/lib/docs/package.json"], &[]);
        assert_eq!(
            bucket(&classification, "lib"),
            vec!["packages/lib/docs/package.json"]
        );
        assert!(classification.is_manifest(Utf8Path::new("packages/lib/docs/package.json")));
    }

    #[test]
    fn test_global_ignore_drops_root_paths() {
        let classification = classify(&["README.md"], &["*.md"]);
        assert!(classification.is_empty());
    }

    #[test]
    fn test_global_ignore_never_drops_manifests() {
        let classification = classify(&["package.json"], &["*.json", "package.json"]);
        let root = classification.root_paths().expect("root bucket");
        assert!(root.contains(Utf8Path::new("package.json")));
    }

    #[test]
    fn test_root_lockfile_is_a_manifest() {
        let classification = classify(&["package-lock.json"], &[]);
        assert!(classification.is_manifest(Utf8Path::new("package-lock.json")));
        assert!(classification.root_paths().is_some());
    }

    #[test]
    fn test_invalid_glob_is_an_error() {
        let graph = graph();
        let global_ignore = vec!["[".to_string()];
        let manifest_names = manifests();
        let mapper = ChangeMapper::new(&graph, &global_ignore, &manifest_names);
        assert!(matches!(
            mapper.classify(&change_set(&["README.md"])),
            Err(Error::InvalidGlob(_))
        ));
    }
}
