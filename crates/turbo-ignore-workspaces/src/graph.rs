use std::collections::{BTreeMap, HashMap, HashSet};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use petgraph::{
    algo::tarjan_scc,
    graph::{Graph, NodeIndex},
    visit::{depth_first_search, DfsEvent, EdgeRef, Reversed},
    Direction,
};
use tracing::debug;

use crate::{Error, WorkspaceCatalog, WorkspaceName, ROOT_WORKSPACE_NAME};

/// A validated workspace within the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceEntry {
    root: Utf8PathBuf,
    dependencies: Vec<WorkspaceName>,
    ignore: Vec<String>,
}

impl WorkspaceEntry {
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn dependencies(&self) -> &[WorkspaceName] {
        &self.dependencies
    }

    pub fn ignore(&self) -> &[String] {
        &self.ignore
    }
}

/// The monorepo dependency graph. Built once per invocation from the
/// discovery document, immutable afterwards.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: Graph<WorkspaceName, ()>,
    node_lookup: HashMap<WorkspaceName, NodeIndex>,
    workspaces: BTreeMap<WorkspaceName, WorkspaceEntry>,
}

impl DependencyGraph {
    pub fn build(catalog: &WorkspaceCatalog) -> Result<Self, Error> {
        let mut graph = Graph::new();
        let mut node_lookup = HashMap::new();
        let mut workspaces = BTreeMap::new();

        for (name, info) in &catalog.workspaces {
            if name == ROOT_WORKSPACE_NAME {
                return Err(Error::ReservedName);
            }
            let name = WorkspaceName::from(name.as_str());
            let root = clean_workspace_root(&name, &info.path)?;
            let index = graph.add_node(name.clone());
            node_lookup.insert(name.clone(), index);
            workspaces.insert(
                name,
                WorkspaceEntry {
                    root,
                    dependencies: info
                        .dependencies
                        .iter()
                        .map(|dependency| WorkspaceName::from(dependency.as_str()))
                        .collect(),
                    ignore: info.ignore.clone(),
                },
            );
        }

        for (name, entry) in &workspaces {
            let from = node_lookup[name];
            for dependency in &entry.dependencies {
                let Some(to) = node_lookup.get(dependency) else {
                    return Err(Error::UnknownDependency {
                        workspace: name.to_string(),
                        dependency: dependency.to_string(),
                    });
                };
                graph.add_edge(from, *to, ());
            }
        }

        let this = Self {
            graph,
            node_lookup,
            workspaces,
        };
        this.validate()?;
        debug!("built dependency graph over {} workspaces", this.len());
        Ok(this)
    }

    pub fn len(&self) -> usize {
        self.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }

    pub fn contains(&self, name: &WorkspaceName) -> bool {
        self.workspaces.contains_key(name)
    }

    pub fn workspace(&self, name: &WorkspaceName) -> Option<&WorkspaceEntry> {
        self.workspaces.get(name)
    }

    pub fn workspaces(&self) -> impl Iterator<Item = (&WorkspaceName, &WorkspaceEntry)> {
        self.workspaces.iter()
    }

    /// All workspaces reachable from `name` along declared dependencies,
    /// excluding `name` itself. A change in any of these can change the
    /// build output of `name`.
    pub fn transitive_dependencies(&self, name: &WorkspaceName) -> HashSet<&WorkspaceName> {
        self.transitive_closure_inner(name, Direction::Outgoing)
    }

    /// All workspaces that would need rebuilding if `name` changed,
    /// excluding `name` itself. Diagnostic counterpart of
    /// [`DependencyGraph::transitive_dependencies`].
    pub fn transitive_dependents(&self, name: &WorkspaceName) -> HashSet<&WorkspaceName> {
        self.transitive_closure_inner(name, Direction::Incoming)
    }

    fn transitive_closure_inner(
        &self,
        node: &WorkspaceName,
        direction: Direction,
    ) -> HashSet<&WorkspaceName> {
        let Some(index) = self.node_lookup.get(node) else {
            return HashSet::new();
        };

        let mut visited = HashSet::new();
        let visitor = |event| {
            if let DfsEvent::Discover(n, _) = event {
                visited.insert(
                    self.graph
                        .node_weight(n)
                        .expect("node index found during dfs doesn't exist"),
                );
            }
        };

        match direction {
            Direction::Outgoing => depth_first_search(&self.graph, Some(*index), visitor),
            Direction::Incoming => depth_first_search(Reversed(&self.graph), Some(*index), visitor),
        };

        visited.remove(node);
        visited
    }

    /// The workspace whose root owns `path`, if any. Roots are validated to
    /// be non-nested, so the longest matching prefix is unique.
    pub fn workspace_for_path(&self, path: &Utf8Path) -> Option<&WorkspaceName> {
        self.workspaces
            .iter()
            .filter(|(_, entry)| path.starts_with(&entry.root))
            .max_by_key(|(_, entry)| entry.root.as_str().len())
            .map(|(name, _)| name)
    }

    fn validate(&self) -> Result<(), Error> {
        self.validate_roots()?;

        let cycle_lines = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|cycle| cycle.len() > 1)
            .map(|cycle| {
                let workspaces = cycle.into_iter().map(|id| {
                    self.graph
                        .node_weight(id)
                        .expect("tarjan_scc returns valid node indices")
                });
                format!("\t{}", workspaces.format(", "))
            })
            .join("\n");

        if !cycle_lines.is_empty() {
            return Err(Error::CyclicDependencies(cycle_lines));
        }

        for edge in self.graph.edge_references() {
            if edge.source() == edge.target() {
                let node = self
                    .graph
                    .node_weight(edge.source())
                    .expect("edge pointed to missing node");
                return Err(Error::SelfDependency(node.clone()));
            }
        }

        Ok(())
    }

    /// Component-wise path ordering places a root immediately before
    /// everything nested under it, so checking neighbors is enough.
    fn validate_roots(&self) -> Result<(), Error> {
        let by_root = self
            .workspaces
            .iter()
            .sorted_by(|(_, a), (_, b)| a.root.cmp(&b.root));

        for ((first, a), (second, b)) in by_root.tuple_windows() {
            if a.root == b.root {
                return Err(Error::DuplicateRoot {
                    first: first.to_string(),
                    second: second.to_string(),
                    path: a.root.clone(),
                });
            }
            if b.root.starts_with(&a.root) {
                return Err(Error::NestedRoots {
                    inner: second.to_string(),
                    inner_path: b.root.clone(),
                    outer: first.to_string(),
                    outer_path: a.root.clone(),
                });
            }
        }

        Ok(())
    }
}

fn clean_workspace_root(name: &WorkspaceName, path: &Utf8Path) -> Result<Utf8PathBuf, Error> {
    let invalid = |reason| Error::InvalidRoot {
        workspace: name.to_string(),
        path: path.to_owned(),
        reason,
    };

    // the discovery document and git both speak `/`
    let normalized = path.as_str().replace('\\', "/");
    let mut cleaned = Utf8PathBuf::new();
    for component in Utf8Path::new(&normalized).components() {
        match component {
            Utf8Component::Normal(segment) => cleaned.push(segment),
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => return Err(invalid("escapes the repository root")),
            Utf8Component::RootDir | Utf8Component::Prefix(_) => {
                return Err(invalid("must be relative to the repository root"))
            }
        }
    }

    if cleaned.as_str().is_empty() {
        return Err(invalid("does not name a directory"));
    }
    Ok(cleaned)
}
