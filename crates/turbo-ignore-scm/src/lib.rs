//! Talks to git on behalf of the decision engine.
//!
//! All repository access goes through the system git binary, which is what
//! CI images actually ship. Soft failures such as an unresolvable base ref
//! or shallow history are folded into [`Provenance`]; only a broken or
//! missing repository is an error.

use camino::Utf8PathBuf;
use thiserror::Error;

mod changes;
pub mod git;
mod github;

pub use changes::{ChangeSet, Provenance};
pub use git::Git;
pub use github::GitHubEnv;

#[derive(Debug, Error)]
pub enum Error {
    #[error("git error: {0}")]
    Git(String),
    #[error("git repository not found at {0}")]
    RepositoryNotFound(Utf8PathBuf),
    #[error("git binary not found: {0}")]
    GitBinaryNotFound(#[from] which::Error),
    #[error("unable to resolve a base ref to compare against")]
    UnableToResolveRef,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("git produced non-utf8 output: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("changed path {0:?} escapes the repository root")]
    PathEscapesRepository(String),
    #[error("changed path {0:?} is not repository-root-relative")]
    AbsolutePath(String),
}
