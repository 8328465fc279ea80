//! Combines the classification with the dependency closure into a verdict.

use camino::Utf8PathBuf;
use turbo_ignore_scm::{ChangeSet, Provenance};
use turbo_ignore_workspaces::{DependencyGraph, WorkspaceName};

use crate::change_mapper::Classification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Build,
    Skip,
}

/// Why the verdict came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    DirectChange,
    TransitiveChange,
    LockfileChange,
    NoRelevantChange,
    ForcedBuild,
    InsufficientHistory,
}

/// The final decision for one workspace, produced fresh per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub workspace: WorkspaceName,
    pub decision: Decision,
    pub reason: Reason,
    /// The paths that triggered the decision, if any.
    pub paths: Vec<Utf8PathBuf>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionOptions {
    /// Escape hatch for manual CI reruns: always build.
    pub force: bool,
}

/// Priority ladder, most conservative first. False positives cost compute;
/// a false negative silently ships a stale artifact, so every uncertain
/// branch resolves to `Build`.
pub fn decide(
    target: &WorkspaceName,
    changes: &ChangeSet,
    classification: &Classification,
    graph: &DependencyGraph,
    options: &DecisionOptions,
) -> Verdict {
    let verdict = |decision, reason, paths| Verdict {
        workspace: target.clone(),
        decision,
        reason,
        paths,
    };

    if options.force {
        return verdict(Decision::Build, Reason::ForcedBuild, Vec::new());
    }

    // a change outside every workspace affects all of them
    if let Some(root_paths) = classification.root_paths() {
        return verdict(
            Decision::Build,
            Reason::DirectChange,
            root_paths.iter().cloned().collect(),
        );
    }

    if let Some(matched) = classification.matched(target) {
        let reason = if matched.iter().any(|path| classification.is_manifest(path)) {
            Reason::LockfileChange
        } else {
            Reason::DirectChange
        };
        return verdict(Decision::Build, reason, matched.iter().cloned().collect());
    }

    let mut triggering: Vec<Utf8PathBuf> = graph
        .transitive_dependencies(target)
        .into_iter()
        .filter_map(|dependency| classification.matched(dependency))
        .flat_map(|paths| paths.iter().cloned())
        .collect();
    if !triggering.is_empty() {
        triggering.sort();
        return verdict(Decision::Build, Reason::TransitiveChange, triggering);
    }

    // without reliable history we refuse to assert safety
    if changes.provenance() == Provenance::FallbackFull {
        return verdict(Decision::Build, Reason::InsufficientHistory, Vec::new());
    }

    verdict(Decision::Skip, Reason::NoRelevantChange, Vec::new())
}
