//! Exit-code and status-line rendering.
//!
//! The binary is the only thing that touches the process boundary; this
//! module just decides what it should say and with which code it should
//! exit.

use camino::Utf8PathBuf;

use crate::decision::{Decision, Reason, Verdict};

/// CI branches on these: zero builds, one skips, two is a configuration or
/// repository error that produced no verdict at all.
pub const BUILD_EXIT_CODE: i32 = 0;
pub const SKIP_EXIT_CODE: i32 = 1;
pub const FATAL_EXIT_CODE: i32 = 2;

const MAX_LISTED_PATHS: usize = 5;

pub fn report(verdict: &Verdict) -> (i32, String) {
    let exit_code = match verdict.decision {
        Decision::Build => BUILD_EXIT_CODE,
        Decision::Skip => SKIP_EXIT_CODE,
    };
    (exit_code, status_line(verdict))
}

fn status_line(verdict: &Verdict) -> String {
    let workspace = &verdict.workspace;
    match verdict.reason {
        Reason::ForcedBuild => {
            format!("{workspace}: proceeding with build, forced")
        }
        Reason::DirectChange => format!(
            "{workspace}: proceeding with build, files changed: {}",
            format_paths(&verdict.paths)
        ),
        Reason::LockfileChange => format!(
            "{workspace}: proceeding with build, manifest or lockfile changed: {}",
            format_paths(&verdict.paths)
        ),
        Reason::TransitiveChange => format!(
            "{workspace}: proceeding with build, files changed in dependencies: {}",
            format_paths(&verdict.paths)
        ),
        Reason::InsufficientHistory => format!(
            "{workspace}: proceeding with build, git history was too shallow to rule it out"
        ),
        Reason::NoRelevantChange => {
            format!("{workspace}: skipping build, no relevant changes")
        }
    }
}

fn format_paths(paths: &[Utf8PathBuf]) -> String {
    let listed = paths
        .iter()
        .take(MAX_LISTED_PATHS)
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let remainder = paths.len().saturating_sub(MAX_LISTED_PATHS);
    if remainder > 0 {
        format!("{listed}, and {remainder} more")
    } else {
        listed
    }
}
