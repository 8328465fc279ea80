use camino::Utf8PathBuf;
use tracing::debug;
use turbo_ignore_scm::Git;
use turbo_ignore_workspaces::{DependencyGraph, WorkspaceCatalog, WorkspaceName};

use crate::{
    change_mapper::ChangeMapper,
    cli::Args,
    decision::{decide, DecisionOptions, Verdict},
    Error,
};

/// One full invocation: load the graph, resolve the change range, classify,
/// decide. Everything is built fresh and discarded with the process.
pub fn run(args: &Args) -> Result<Verdict, Error> {
    let cwd = match &args.cwd {
        Some(cwd) => cwd.clone(),
        None => {
            let cwd = std::env::current_dir().map_err(Error::Cwd)?;
            Utf8PathBuf::from_path_buf(cwd).map_err(Error::NonUtf8Cwd)?
        }
    };

    let git = Git::find(&cwd)?;
    debug!("repository root: {}", git.root());

    let metadata_path = if args.workspaces.is_relative() {
        cwd.join(&args.workspaces)
    } else {
        args.workspaces.clone()
    };
    let catalog = WorkspaceCatalog::from_file(&metadata_path)?;
    let graph = DependencyGraph::build(&catalog)?;

    let target = WorkspaceName::from(args.workspace.as_str());
    if !graph.contains(&target) {
        return Err(Error::MissingWorkspace(target));
    }

    let changes = git.resolve_changes(
        args.base.as_deref(),
        args.head.as_deref(),
        args.include_uncommitted,
    )?;
    debug!(
        "resolved {} changed paths with provenance {:?}",
        changes.len(),
        changes.provenance()
    );

    let manifest_names = args.manifest_names();
    let mapper = ChangeMapper::new(&graph, &args.global_ignore, &manifest_names);
    let classification = mapper.classify(&changes)?;

    Ok(decide(
        &target,
        &changes,
        &classification,
        &graph,
        &DecisionOptions { force: args.force },
    ))
}
