use camino::Utf8PathBuf;
use clap::Parser;

/// Manifest and lockfile names a dependency-version bump flows through;
/// changes to these can never be ignored. The set is an ecosystem
/// convention, so `--manifest` replaces it rather than extending it.
pub const DEFAULT_MANIFESTS: &[&str] = &[
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "turbo.json",
];

#[derive(Parser, Clone, Debug, PartialEq)]
#[clap(author, about = "Skip CI work for workspaces the current change set cannot affect", long_about = None)]
pub struct Args {
    /// The workspace to produce a verdict for
    pub workspace: String,
    /// Base of the comparison range. Defaults to the CI-provided base
    /// branch, then `main`, then `master`
    #[clap(long, value_parser)]
    pub base: Option<String>,
    /// Head of the comparison range [default: HEAD]
    #[clap(long, value_parser)]
    pub head: Option<String>,
    /// Workspace metadata document produced by workspace discovery
    #[clap(long, value_parser, default_value = "workspaces.json")]
    pub workspaces: Utf8PathBuf,
    /// Build regardless of what changed
    #[clap(long)]
    pub force: bool,
    /// Count uncommitted working-tree changes as part of the change set
    #[clap(long)]
    pub include_uncommitted: bool,
    /// Repository-root globs that affect no workspace, e.g. "*.md"
    #[clap(long = "ignore", value_name = "GLOB")]
    pub global_ignore: Vec<String>,
    /// Never-ignorable manifest and lockfile names; replaces the default
    /// set when given
    #[clap(long = "manifest", value_name = "FILE")]
    pub manifests: Vec<String>,
    /// Run as if started in this directory
    #[clap(long, value_parser)]
    pub cwd: Option<Utf8PathBuf>,
}

impl Args {
    /// The injected never-ignorable filename set, defaulted per ecosystem
    /// convention when the caller supplies none.
    pub fn manifest_names(&self) -> Vec<String> {
        if self.manifests.is_empty() {
            DEFAULT_MANIFESTS.iter().map(|name| name.to_string()).collect()
        } else {
            self.manifests.clone()
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_minimal_invocation() {
        let args = Args::try_parse_from(["turbo-ignore", "web"]).unwrap();
        assert_eq!(args.workspace, "web");
        assert_eq!(args.base, None);
        assert_eq!(args.workspaces, Utf8PathBuf::from("workspaces.json"));
        assert!(!args.force);
        assert_eq!(args.manifest_names(), DEFAULT_MANIFESTS.to_vec());
    }

    #[test]
    fn test_manifest_flags_replace_the_default_set() {
        let args = Args::try_parse_from([
            "turbo-ignore",
            "web",
            "--manifest",
            "Cargo.toml",
            "--manifest",
            "Cargo.lock",
        ])
        .unwrap();
        assert_eq!(args.manifest_names(), vec!["Cargo.toml", "Cargo.lock"]);
    }

    #[test]
    fn test_workspace_is_required() {
        assert!(Args::try_parse_from(["turbo-ignore"]).is_err());
    }
}
