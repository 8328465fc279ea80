//! Decides whether a workspace's CI build can be skipped because the
//! current change set cannot affect it.
//!
//! The pipeline is: resolve the change range, classify changed paths onto
//! workspaces, combine with the dependency closure, report an exit code.
//! Every uncertain branch resolves toward building; a skipped build that
//! was actually needed is the one failure this tool exists to prevent.

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use turbo_ignore_workspaces::WorkspaceName;

mod change_mapper;
pub mod cli;
mod decision;
mod report;
mod run;

pub use change_mapper::{ChangeMapper, Classification};
pub use cli::Args;
pub use decision::{decide, Decision, DecisionOptions, Reason, Verdict};
pub use report::{report, BUILD_EXIT_CODE, FATAL_EXIT_CODE, SKIP_EXIT_CODE};
pub use run::run;

#[derive(Debug, Error)]
pub enum Error {
    #[error("workspace \"{0}\" is not in the workspace metadata")]
    MissingWorkspace(WorkspaceName),
    #[error(transparent)]
    Workspaces(#[from] turbo_ignore_workspaces::Error),
    #[error(transparent)]
    Scm(#[from] turbo_ignore_scm::Error),
    #[error(transparent)]
    ChangeMapper(#[from] change_mapper::Error),
    #[error("unable to determine the working directory: {0}")]
    Cwd(#[source] std::io::Error),
    #[error("working directory is not valid utf-8: {0:?}")]
    NonUtf8Cwd(std::path::PathBuf),
}

pub fn main() -> i32 {
    let args = Args::parse();
    init_tracing();

    match run::run(&args) {
        Ok(verdict) => {
            let (exit_code, message) = report::report(&verdict);
            println!("{message}");
            exit_code
        }
        Err(error) => {
            eprintln!("turbo-ignore: {error}");
            report::FATAL_EXIT_CODE
        }
    }
}

/// Logs are opt-in and go to stderr; the status line on stdout and the
/// exit code are the contract with CI.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("TURBO_IGNORE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
