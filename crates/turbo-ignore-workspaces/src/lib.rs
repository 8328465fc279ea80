//! Workspace metadata and the dependency graph derived from it.
//!
//! Workspaces are supplied by an external discovery step as a metadata
//! document; this crate validates that document, builds an immutable graph
//! from it, and answers reachability queries over the graph. It never
//! discovers workspaces itself.

use std::fmt;

use camino::Utf8PathBuf;
use thiserror::Error;

mod catalog;
mod graph;

pub use catalog::{WorkspaceCatalog, WorkspaceInfo};
pub use graph::{DependencyGraph, WorkspaceEntry};

pub const ROOT_WORKSPACE_NAME: &str = "//";

/// A workspace identifier, or the sentinel for the repository root.
///
/// `Root` is not a real workspace. It is where changed paths that belong to
/// no workspace land during classification, and it may never be declared in
/// the metadata document.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum WorkspaceName {
    Root,
    Other(String),
}

impl From<&str> for WorkspaceName {
    fn from(name: &str) -> Self {
        match name {
            ROOT_WORKSPACE_NAME => Self::Root,
            name => Self::Other(name.to_string()),
        }
    }
}

impl From<String> for WorkspaceName {
    fn from(name: String) -> Self {
        match name.as_str() {
            ROOT_WORKSPACE_NAME => Self::Root,
            _ => Self::Other(name),
        }
    }
}

impl fmt::Display for WorkspaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str(ROOT_WORKSPACE_NAME),
            Self::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cyclic workspace dependencies detected:\n{0}")]
    CyclicDependencies(String),
    #[error("{0} depends on itself")]
    SelfDependency(WorkspaceName),
    #[error(
        "workspace \"{workspace}\" depends on \"{dependency}\", which is not in the workspace \
         metadata"
    )]
    UnknownDependency {
        workspace: String,
        dependency: String,
    },
    #[error("workspaces \"{first}\" and \"{second}\" both claim \"{path}\"")]
    DuplicateRoot {
        first: String,
        second: String,
        path: Utf8PathBuf,
    },
    #[error(
        "workspace \"{inner}\" at \"{inner_path}\" is nested inside workspace \"{outer}\" at \
         \"{outer_path}\""
    )]
    NestedRoots {
        inner: String,
        inner_path: Utf8PathBuf,
        outer: String,
        outer_path: Utf8PathBuf,
    },
    #[error("workspace \"{workspace}\" has an invalid root path \"{path}\": {reason}")]
    InvalidRoot {
        workspace: String,
        path: Utf8PathBuf,
        reason: &'static str,
    },
    #[error("the workspace name \"//\" is reserved for the repository root")]
    ReservedName,
    #[error("unable to parse workspace metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("unable to read workspace metadata: {0}")]
    Io(#[from] std::io::Error),
}
