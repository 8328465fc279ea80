use std::{path::PathBuf, process::Command};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::warn;

use crate::{
    changes::{ChangeSet, Provenance},
    github::GitHubEnv,
    Error,
};

/// Handle to a git repository, bound to the system git binary.
#[derive(Debug)]
pub struct Git {
    root: Utf8PathBuf,
    bin: PathBuf,
}

impl Git {
    /// Locates the repository containing `path`. Not being inside a
    /// repository is fatal; there is no verdict to give without one.
    pub fn find(path: &Utf8Path) -> Result<Self, Error> {
        let bin = which::which("git")?;
        let output = Command::new(&bin)
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(path)
            .output()?;
        if !output.status.success() {
            return Err(Error::RepositoryNotFound(path.to_owned()));
        }
        let root = String::from_utf8(output.stdout)?;
        Ok(Self {
            root: Utf8PathBuf::from(root.trim()),
            bin,
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Resolves the comparison range and returns the paths it touches.
    ///
    /// Soft failures never error here: an unresolvable base degrades to a
    /// diff from the repository's initial commit, recorded as
    /// [`Provenance::FallbackFull`] so the verdict stays conservative. An
    /// empty diff is a valid, empty change set.
    pub fn resolve_changes(
        &self,
        base: Option<&str>,
        head: Option<&str>,
        include_uncommitted: bool,
    ) -> Result<ChangeSet, Error> {
        let head_ref = head.unwrap_or("HEAD");
        // merge-base comparison only when both ends of the range were
        // given explicitly
        let merge_base = head.is_some();

        let mut changes = match self.resolve_base(base, GitHubEnv::new()) {
            Ok(base_ref) => match self.changed_in_range(&base_ref, head_ref, merge_base) {
                Ok(changes) => changes,
                Err(ref error @ Error::Git(ref message)) if is_unknown_range(message) => {
                    warn!("unable to diff against {base_ref}, falling back: {error}");
                    self.full_history_fallback(head_ref)?
                }
                Err(error) => return Err(error),
            },
            Err(Error::UnableToResolveRef) => {
                warn!("unable to resolve a base ref, falling back to the initial commit");
                self.full_history_fallback(head_ref)?
            }
            Err(error) => return Err(error),
        };

        if include_uncommitted {
            self.add_uncommitted(&mut changes)?;
            if changes.provenance() != Provenance::FallbackFull {
                changes.mark(Provenance::FallbackUncommitted);
            }
        }

        Ok(changes)
    }

    fn resolve_base(&self, base_override: Option<&str>, env: GitHubEnv) -> Result<String, Error> {
        if let Some(base) = base_override {
            return Ok(base.to_string());
        }

        if let Some(base_ref) = env.base_ref() {
            // the CI event told us the base; if it does not resolve locally
            // there is no better guess to fall through to
            return match self.execute_git_command(&["rev-parse", &base_ref]) {
                Ok(_) => Ok(base_ref),
                Err(error) => {
                    warn!("base ref {base_ref} from the GitHub event does not resolve: {error}");
                    Err(Error::UnableToResolveRef)
                }
            };
        }

        if self.execute_git_command(&["rev-parse", "main"]).is_ok() {
            return Ok("main".to_string());
        }
        if self.execute_git_command(&["rev-parse", "master"]).is_ok() {
            return Ok("master".to_string());
        }
        Err(Error::UnableToResolveRef)
    }

    fn changed_in_range(
        &self,
        from: &str,
        to: &str,
        merge_base: bool,
    ) -> Result<ChangeSet, Error> {
        let mut args = vec!["diff-tree", "-r", "--name-only", "--no-commit-id", from, to];
        if merge_base {
            args.push("--merge-base");
        }

        let output = self.execute_git_command(&args)?;
        let mut changes = ChangeSet::new(Provenance::DiffRange);
        add_paths_from_stdout(&mut changes, output)?;
        Ok(changes)
    }

    /// Diffs from the repository's initial commit. Failures past this point
    /// stay soft: an empty `FallbackFull` set still forces a build through
    /// its provenance.
    fn full_history_fallback(&self, head: &str) -> Result<ChangeSet, Error> {
        let mut changes = ChangeSet::new(Provenance::FallbackFull);

        let root_commit = match self.initial_commit() {
            Ok(Some(root_commit)) => root_commit,
            Ok(None) => return Ok(changes),
            Err(error) => {
                warn!("unable to find the initial commit: {error}");
                return Ok(changes);
            }
        };

        match self.execute_git_command(&[
            "diff-tree",
            "-r",
            "--name-only",
            "--no-commit-id",
            &root_commit,
            head,
        ]) {
            Ok(output) => add_paths_from_stdout(&mut changes, output)?,
            Err(error) => warn!("fallback diff from {root_commit} failed: {error}"),
        }

        Ok(changes)
    }

    fn initial_commit(&self) -> Result<Option<String>, Error> {
        let output = self.execute_git_command(&["rev-list", "--max-parents=0", "HEAD"])?;
        let stdout = String::from_utf8(output)?;
        // a repository can have several root commits; the first reachable
        // one is enough for a conservative diff
        Ok(stdout.lines().next().map(|line| line.trim().to_owned()))
    }

    fn add_uncommitted(&self, changes: &mut ChangeSet) -> Result<(), Error> {
        // files git does not track yet, plus unstaged modifications
        let output = self.execute_git_command(&[
            "ls-files",
            "--others",
            "--modified",
            "--exclude-standard",
        ])?;
        add_paths_from_stdout(changes, output)?;

        // staged but not yet committed
        let output = self.execute_git_command(&["diff", "--name-only", "--cached"])?;
        add_paths_from_stdout(changes, output)?;

        Ok(())
    }

    fn execute_git_command(&self, args: &[&str]) -> Result<Vec<u8>, Error> {
        let output = Command::new(&self.bin)
            .args(args)
            .current_dir(&self.root)
            .env("GIT_OPTIONAL_LOCKS", "0")
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            Err(Error::Git(stderr))
        } else {
            Ok(output.stdout)
        }
    }
}

fn add_paths_from_stdout(changes: &mut ChangeSet, stdout: Vec<u8>) -> Result<(), Error> {
    let stdout = String::from_utf8(stdout)?;
    for line in stdout.lines() {
        changes.insert(line)?;
    }
    Ok(())
}

fn is_unknown_range(message: &str) -> bool {
    message.contains("unknown revision")
        || message.contains("bad object")
        || message.contains("bad revision")
        || message.contains("no merge base")
}

#[cfg(test)]
mod test {
    use std::{fs, path::Path};

    use git2::{Oid, Repository, RepositoryInitOptions};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use test_case::test_case;

    use super::*;

    fn setup_repository(
        init_opts: Option<&RepositoryInitOptions>,
    ) -> Result<(TempDir, Repository), anyhow::Error> {
        let repo_root = tempfile::tempdir()?;
        let repo = Repository::init_opts(
            repo_root.path(),
            init_opts.unwrap_or(&RepositoryInitOptions::new()),
        )?;
        let mut config = repo.config()?;
        config.set_str("user.name", "test")?;
        config.set_str("user.email", "test@example.com")?;

        Ok((repo_root, repo))
    }

    fn commit_file(repo: &Repository, path: &Path, previous_commit: Option<Oid>) -> Oid {
        let mut index = repo.index().unwrap();
        index.add_path(path).unwrap();
        let tree_oid = index.write_tree().unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(tree_oid).unwrap();
        let previous_commit = previous_commit
            .map(|oid| repo.find_commit(oid))
            .transpose()
            .unwrap();

        repo.commit(
            Some("HEAD"),
            &repo.signature().unwrap(),
            &repo.signature().unwrap(),
            "Commit",
            &tree,
            previous_commit
                .as_ref()
                .as_ref()
                .map(std::slice::from_ref)
                .unwrap_or_default(),
        )
        .unwrap()
    }

    fn find(repo_root: &TempDir) -> Git {
        Git::find(Utf8Path::from_path(repo_root.path()).unwrap()).unwrap()
    }

    fn paths(changes: &ChangeSet) -> Vec<String> {
        changes.paths().map(|path| path.to_string()).collect()
    }

    #[test]
    fn test_find_outside_repository() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let result = Git::find(Utf8Path::from_path(dir.path()).unwrap());
        assert!(matches!(result, Err(Error::RepositoryNotFound(_))));
        Ok(())
    }

    #[test]
    fn test_changes_between_commits() -> Result<(), anyhow::Error> {
        let (repo_root, repo) = setup_repository(None)?;

        fs::write(repo_root.path().join("foo.js"), "let z = 0;")?;
        let first_commit = commit_file(&repo, Path::new("foo.js"), None);

        fs::write(repo_root.path().join("bar.js"), "let y = 1;")?;
        let second_commit = commit_file(&repo, Path::new("bar.js"), Some(first_commit));

        let git = find(&repo_root);
        let changes = git.resolve_changes(
            Some(&first_commit.to_string()),
            Some(&second_commit.to_string()),
            false,
        )?;

        assert_eq!(changes.provenance(), Provenance::DiffRange);
        assert_eq!(paths(&changes), vec!["bar.js".to_string()]);
        Ok(())
    }

    #[test]
    fn test_empty_diff_is_valid() -> Result<(), anyhow::Error> {
        let (repo_root, repo) = setup_repository(None)?;

        fs::write(repo_root.path().join("foo.js"), "let z = 0;")?;
        commit_file(&repo, Path::new("foo.js"), None);

        let git = find(&repo_root);
        let changes = git.resolve_changes(Some("HEAD"), None, false)?;

        assert_eq!(changes.provenance(), Provenance::DiffRange);
        assert!(changes.is_empty());
        Ok(())
    }

    #[test]
    fn test_uncommitted_changes_are_unioned() -> Result<(), anyhow::Error> {
        let (repo_root, repo) = setup_repository(None)?;

        fs::write(repo_root.path().join("foo.js"), "let z = 0;")?;
        commit_file(&repo, Path::new("foo.js"), None);

        fs::write(repo_root.path().join("bar.js"), "let y = 1;")?;

        let git = find(&repo_root);

        // not considered unless asked for
        let changes = git.resolve_changes(Some("HEAD"), None, false)?;
        assert!(changes.is_empty());

        let changes = git.resolve_changes(Some("HEAD"), None, true)?;
        assert_eq!(changes.provenance(), Provenance::FallbackUncommitted);
        assert_eq!(paths(&changes), vec!["bar.js".to_string()]);
        Ok(())
    }

    #[test]
    fn test_unresolvable_base_falls_back_to_initial_commit() -> Result<(), anyhow::Error> {
        let (repo_root, repo) = setup_repository(None)?;

        fs::write(repo_root.path().join("foo.js"), "let z = 0;")?;
        let first_commit = commit_file(&repo, Path::new("foo.js"), None);

        fs::write(repo_root.path().join("bar.js"), "let y = 1;")?;
        commit_file(&repo, Path::new("bar.js"), Some(first_commit));

        let git = find(&repo_root);
        let changes = git.resolve_changes(Some("does-not-exist"), None, false)?;

        assert_eq!(changes.provenance(), Provenance::FallbackFull);
        // everything since the initial commit counts as changed
        assert_eq!(paths(&changes), vec!["bar.js".to_string()]);
        Ok(())
    }

    #[test]
    fn test_single_commit_repository_falls_back_empty() -> Result<(), anyhow::Error> {
        let (repo_root, repo) = setup_repository(None)?;

        fs::write(repo_root.path().join("foo.js"), "let z = 0;")?;
        commit_file(&repo, Path::new("foo.js"), None);

        let git = find(&repo_root);
        let changes = git.resolve_changes(Some("does-not-exist"), None, false)?;

        // the initial commit is HEAD, so the fallback diff is empty; the
        // provenance alone keeps the verdict conservative
        assert_eq!(changes.provenance(), Provenance::FallbackFull);
        assert!(changes.is_empty());
        Ok(())
    }

    #[test_case(vec!["main"],                      None,            Some("main"))]
    #[test_case(vec!["master"],                    None,            Some("master"))]
    #[test_case(vec!["trunk"],                     None,            None)]
    #[test_case(vec!["trunk", "main"],             Some("trunk"),   Some("trunk"))]
    #[test_case(vec!["trunk", "main"],             None,            Some("main"))]
    #[test_case(vec!["trunk", "master", "main"],   None,            Some("main"))]
    #[test_case(vec!["trunk", "master"],           None,            Some("master"))]
    fn test_base_resolution(
        branches_to_create: Vec<&str>,
        base_override: Option<&str>,
        expected: Option<&str>,
    ) -> Result<(), anyhow::Error> {
        let mut repo_opts = RepositoryInitOptions::new();

        let (first_branch, remaining_branches) = branches_to_create.split_first().unwrap();
        let repo_init = repo_opts.initial_head(first_branch);
        let (repo_root, repo) = setup_repository(Some(repo_init))?;

        // a branch only exists once something is committed to it
        fs::write(repo_root.path().join("todo.txt"), "1. commit")?;
        let first_commit = commit_file(&repo, Path::new("todo.txt"), None);
        let commit = repo.find_commit(first_commit)?;

        for branch in remaining_branches {
            repo.branch(branch, &commit, true)?;
        }

        let git = find(&repo_root);
        let actual = git.resolve_base(base_override, GitHubEnv::none()).ok();

        assert_eq!(actual.as_deref(), expected);
        Ok(())
    }
}
