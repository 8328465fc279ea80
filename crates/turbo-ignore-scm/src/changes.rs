use std::collections::BTreeSet;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use crate::Error;

/// How a [`ChangeSet`] was derived. Anything other than `DiffRange` tells
/// the decision engine to be more conservative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Path-level diff between two resolvable commits.
    DiffRange,
    /// The base ref could not be used; the diff was taken from the
    /// repository's initial commit instead.
    FallbackFull,
    /// Uncommitted working-tree changes were unioned into the set.
    FallbackUncommitted,
}

/// Deduplicated, ordered set of changed repository-root-relative paths.
///
/// Invariant: every path uses `/` separators and stays inside the
/// repository root. An empty set is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    paths: BTreeSet<Utf8PathBuf>,
    provenance: Provenance,
}

impl ChangeSet {
    pub fn new(provenance: Provenance) -> Self {
        Self {
            paths: BTreeSet::new(),
            provenance,
        }
    }

    /// Normalizes and inserts one changed path. Blank lines from porcelain
    /// output reduce to nothing and are dropped.
    pub fn insert(&mut self, raw: &str) -> Result<(), Error> {
        if let Some(path) = normalize(raw)? {
            self.paths.insert(path);
        }
        Ok(())
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub(crate) fn mark(&mut self, provenance: Provenance) {
        self.provenance = provenance;
    }

    pub fn paths(&self) -> impl Iterator<Item = &Utf8Path> {
        self.paths.iter().map(Utf8PathBuf::as_path)
    }

    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn normalize(raw: &str) -> Result<Option<Utf8PathBuf>, Error> {
    let unix = raw.trim().replace('\\', "/");

    let mut cleaned = Utf8PathBuf::new();
    for component in Utf8Path::new(&unix).components() {
        match component {
            Utf8Component::Normal(segment) => cleaned.push(segment),
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                return Err(Error::PathEscapesRepository(raw.to_string()))
            }
            Utf8Component::RootDir | Utf8Component::Prefix(_) => {
                return Err(Error::AbsolutePath(raw.to_string()))
            }
        }
    }

    if cleaned.as_str().is_empty() {
        return Ok(None);
    }
    Ok(Some(cleaned))
}
