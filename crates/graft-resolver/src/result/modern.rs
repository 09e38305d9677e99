//! The component-level resolution result, backed by petgraph.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use graft_core::identifier::{ComponentIdentifier, ModuleIdentifier, ModuleVersionIdentifier, ModuleVersionSelector};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::graph::{DependencyGraphVisitor, NodeView, SelectorView};
use crate::resolvers::{ModuleVersionResolveError, SelectionReason};

/// A selected component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedComponentResult {
    pub id: ModuleVersionIdentifier,
    pub component_id: ComponentIdentifier,
    pub reason: SelectionReason,
}

impl ResolvedComponentResult {
    /// `group:name` identifier (without version).
    pub fn key(&self) -> String {
        self.id.module.to_string()
    }
}

impl fmt::Display for ResolvedComponentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Edge label: what the dependent asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependencyResult {
    pub requested: ModuleVersionSelector,
}

/// A dependency that did not resolve to any component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedDependencyResult {
    pub from: ModuleVersionIdentifier,
    pub requested: ModuleVersionSelector,
    pub failure: ModuleVersionResolveError,
}

/// The resolved component graph.
#[derive(Debug, Default)]
pub struct ResolutionResult {
    graph: DiGraph<ResolvedComponentResult, ResolvedDependencyResult>,
    index: HashMap<ModuleIdentifier, NodeIndex>,
    root: Option<NodeIndex>,
    unresolved: Vec<UnresolvedDependencyResult>,
}

impl ResolutionResult {
    pub fn root(&self) -> Option<&ResolvedComponentResult> {
        self.root.map(|idx| &self.graph[idx])
    }

    pub fn root_index(&self) -> Option<NodeIndex> {
        self.root
    }

    pub fn node(&self, idx: NodeIndex) -> &ResolvedComponentResult {
        &self.graph[idx]
    }

    /// Every selected component, excluding the root.
    pub fn components(&self) -> Vec<&ResolvedComponentResult> {
        self.graph
            .node_indices()
            .filter(|&idx| Some(idx) != self.root)
            .map(|idx| &self.graph[idx])
            .collect()
    }

    pub fn unresolved(&self) -> &[UnresolvedDependencyResult] {
        &self.unresolved
    }

    /// Look up a component by `group:name`, or by bare name.
    pub fn find(&self, key: &str) -> Option<NodeIndex> {
        if let Some(module) = ModuleIdentifier::parse(key) {
            if let Some(&idx) = self.index.get(&module) {
                return Some(idx);
            }
        }
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx].id.name() == key)
    }

    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &ResolvedDependencyResult)> {
        let mut deps: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
            .collect();
        // petgraph yields edges newest first.
        deps.reverse();
        deps
    }

    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &ResolvedDependencyResult)> {
        let mut deps: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
            .collect();
        deps.reverse();
        deps
    }

    /// Render the dependency tree below the root.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let Some(root) = self.root else {
            return output;
        };
        output.push_str(&format!("{}\n", self.graph[root]));

        let children = self.tree_children(root);
        let count = children.len();
        let mut visited = HashSet::from([root]);
        for (i, child) in children.into_iter().enumerate() {
            self.print_subtree(&mut output, child, "", i == count - 1, 1, max_depth, &mut visited);
        }
        output
    }

    fn tree_children(&self, idx: NodeIndex) -> Vec<TreeChild<'_>> {
        let from = &self.graph[idx].id;
        let mut children: Vec<TreeChild<'_>> = self
            .dependencies_of(idx)
            .into_iter()
            .map(|(target, edge)| TreeChild::Resolved(target, edge))
            .collect();
        children.extend(
            self.unresolved
                .iter()
                .filter(|u| &u.from == from)
                .map(TreeChild::Unresolved),
        );
        children
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        child: TreeChild<'_>,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let idx = match child {
            TreeChild::Unresolved(u) => {
                output.push_str(&format!("{prefix}{connector}{} FAILED\n", u.requested));
                return;
            }
            TreeChild::Resolved(idx, edge) => {
                let node = &self.graph[idx];
                output.push_str(&format!("{prefix}{connector}{}{}\n", describe(edge, node), annotate(node)));
                idx
            }
        };

        if max_depth.is_some_and(|max| depth >= max) {
            return;
        }
        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let children = self.tree_children(idx);
        let count = children.len();
        for (i, grandchild) in children.into_iter().enumerate() {
            self.print_subtree(
                output,
                grandchild,
                &child_prefix,
                i == count - 1,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&idx);
    }

    /// Shortest path from the root to a component.
    ///
    /// Accepts either `group:name` or just `name`.
    pub fn find_path(&self, target_key: &str) -> Option<Vec<&ResolvedComponentResult>> {
        let root = self.root?;
        let target = self.find(target_key)?;
        let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([root]);
        let mut seen = HashSet::from([root]);
        while let Some(current) = queue.pop_front() {
            if current == target {
                let mut path = vec![current];
                let mut at = current;
                while let Some(&p) = previous.get(&at) {
                    path.push(p);
                    at = p;
                }
                path.reverse();
                return Some(path.into_iter().map(|idx| &self.graph[idx]).collect());
            }
            for (next, _) in self.dependencies_of(current) {
                if seen.insert(next) {
                    previous.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Render everything that depends on a component, up to the root.
    pub fn print_inverted_tree(&self, target_key: &str) -> String {
        let mut output = String::new();
        let Some(idx) = self.find(target_key) else {
            return output;
        };
        output.push_str(&format!("{}{}\n", self.graph[idx], annotate(&self.graph[idx])));

        let mut visited = HashSet::from([idx]);
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dependent, _)) in dependents.iter().enumerate() {
            self.print_inverted_subtree(&mut output, *dependent, "", i == count - 1, &mut visited);
        }
        output
    }

    fn print_inverted_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", self.graph[idx]));

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dependent, _)) in dependents.iter().enumerate() {
            self.print_inverted_subtree(output, *dependent, &child_prefix, i == count - 1, visited);
        }

        visited.remove(&idx);
    }

    /// Number of components (excluding root).
    pub fn len(&self) -> usize {
        let total = self.graph.node_count();
        if self.root.is_some() {
            total.saturating_sub(1)
        } else {
            total
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy)]
enum TreeChild<'a> {
    Resolved(NodeIndex, &'a ResolvedDependencyResult),
    Unresolved(&'a UnresolvedDependencyResult),
}

// `requested -> selected` when the selector and the winner differ.
fn describe(edge: &ResolvedDependencyResult, node: &ResolvedComponentResult) -> String {
    if edge.requested.module == node.id.module && edge.requested.version == node.id.version {
        node.id.to_string()
    } else if edge.requested.module == node.id.module {
        format!("{} -> {}", edge.requested, node.id.version)
    } else {
        format!("{} -> {}", edge.requested, node.id)
    }
}

fn annotate(node: &ResolvedComponentResult) -> String {
    match node.reason {
        SelectionReason::Root | SelectionReason::Requested => String::new(),
        reason => format!(" ({reason})"),
    }
}

/// Visitor that builds a [`ResolutionResult`].
#[derive(Default)]
pub struct ResolutionResultBuilder {
    result: ResolutionResult,
    by_component: HashMap<u64, NodeIndex>,
}

impl ResolutionResultBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(self) -> ResolutionResult {
        self.result
    }
}

impl DependencyGraphVisitor for ResolutionResultBuilder {
    fn start(&mut self, _root: NodeView<'_>) {}

    fn visit_node(&mut self, node: NodeView<'_>) {
        let owner = node.owner();
        if self.by_component.contains_key(&owner.result_id()) {
            return;
        }
        let idx = self.result.graph.add_node(ResolvedComponentResult {
            id: owner.id().clone(),
            component_id: owner.component_id(),
            reason: owner.reason(),
        });
        self.by_component.insert(owner.result_id(), idx);
        self.result.index.insert(owner.id().module.clone(), idx);
        if node.is_root() {
            self.result.root = Some(idx);
        }
    }

    fn visit_selector(&mut self, _selector: SelectorView<'_>) {}

    fn visit_edges(&mut self, node: NodeView<'_>) {
        let owner = node.owner();
        let Some(&from) = self.by_component.get(&owner.result_id()) else {
            return;
        };
        for edge in node.outgoing() {
            if let Some(failure) = edge.failure() {
                let unresolved = UnresolvedDependencyResult {
                    from: owner.id().clone(),
                    requested: edge.requested().clone(),
                    failure: failure.clone(),
                };
                if !self.result.unresolved.contains(&unresolved) {
                    self.result.unresolved.push(unresolved);
                }
                continue;
            }
            for target in edge.targets() {
                let Some(&to) = self.by_component.get(&target.owner().result_id()) else {
                    continue;
                };
                let graph = &mut self.result.graph;
                if from != to && !graph.edges(from).any(|e| e.target() == to) {
                    graph.add_edge(
                        from,
                        to,
                        ResolvedDependencyResult {
                            requested: edge.requested().clone(),
                        },
                    );
                }
            }
        }
    }

    fn finish(&mut self, _root: NodeView<'_>) {}
}
