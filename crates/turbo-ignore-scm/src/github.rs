//! Base-ref inference for GitHub Actions.
//!
//! For the environment variables involved, see: https://docs.github.com/en/actions/writing-workflows/choosing-what-your-workflow-does/store-information-in-variables#default-environment-variables

use std::{
    env::{self, VarError},
    fs,
};

use serde::Deserialize;

/// Pushes report this placeholder instead of a real parent on the first
/// push of a branch and on force pushes.
const UNKNOWN_SHA: &str = "0000000000000000000000000000000000000000";

#[derive(Debug, Deserialize, Clone)]
struct PushCommit {
    id: String,
}

#[derive(Debug, Deserialize, Default)]
struct PushEvent {
    #[serde(default)]
    before: String,

    #[serde(default)]
    commits: Vec<PushCommit>,

    #[serde(default)]
    forced: bool,
}

impl PushEvent {
    fn parent_of_first_commit(&self) -> Option<String> {
        if self.commits.is_empty() {
            // pushing a branch with no commits leaves this empty
            return None;
        }

        if self.commits.len() >= 2048 {
            // GitHub truncates this field at 2048 commits, so the first
            // entry is no longer necessarily the oldest commit of the push
            return None;
        }

        let id = &self.commits.first()?.id;
        Some(format!("{id}^"))
    }
}

/// Snapshot of the GitHub Actions environment taken at startup.
#[derive(Debug)]
pub struct GitHubEnv {
    is_github_actions: bool,
    base_ref: Result<String, VarError>,
    event_path: Result<String, VarError>,
}

impl Default for GitHubEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubEnv {
    pub fn new() -> Self {
        Self {
            is_github_actions: matches!(env::var("GITHUB_ACTIONS"), Ok(v) if v == "true"),
            base_ref: env::var("GITHUB_BASE_REF"),
            event_path: env::var("GITHUB_EVENT_PATH"),
        }
    }

    pub fn none() -> Self {
        Self {
            is_github_actions: false,
            base_ref: Err(VarError::NotPresent),
            event_path: Err(VarError::NotPresent),
        }
    }

    /// The ref CI is comparing against, if the environment knows one.
    ///
    /// Pull request runs expose it directly in `GITHUB_BASE_REF`; push runs
    /// only record it inside the event payload, where first pushes and
    /// force pushes need the parent of the first pushed commit instead of
    /// the `before` field.
    pub fn base_ref(&self) -> Option<String> {
        if !self.is_github_actions {
            return None;
        }

        // empty in a regular commit: only pull_request events set it
        if let Ok(pull_request_base) = &self.base_ref {
            if !pull_request_base.is_empty() {
                return Some(pull_request_base.clone());
            }
        }

        let event_path = self.event_path.as_ref().ok()?;
        let data = fs::read_to_string(event_path).ok()?;
        let event: PushEvent = serde_json::from_str(&data).ok()?;

        if event.before == UNKNOWN_SHA || event.forced {
            return event.parent_of_first_commit();
        }

        if event.before.is_empty() {
            return None;
        }

        Some(event.before.clone())
    }
}
