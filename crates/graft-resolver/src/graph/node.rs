use graft_core::identifier::ResolvedConfigurationIdentifier;
use graft_core::metadata::ConfigurationMetadata;
use graft_util::errors::GraftError;
use indexmap::IndexSet;
use std::sync::Arc;

use super::state::ResolveState;
use super::{ComponentRef, EdgeId, ModuleState, NodeId};
use crate::exclusions::ModuleExclusion;

/// One configuration of one component.
#[derive(Debug)]
pub(crate) struct NodeState {
    pub result_id: u64,
    pub id: ResolvedConfigurationIdentifier,
    pub component: ComponentRef,
    pub metadata: Arc<ConfigurationMetadata>,
    pub incoming: IndexSet<EdgeId>,
    pub outgoing: IndexSet<EdgeId>,
    /// Filter used the last time outgoing edges were created; `None` if never traversed.
    pub previous_exclusions: Option<ModuleExclusion>,
    pub is_root: bool,
}

impl NodeState {
    /// A node is part of the graph while something points at it.
    pub fn is_selected(&self) -> bool {
        self.is_root || !self.incoming.is_empty()
    }
}

impl ResolveState<'_> {
    pub fn get_node(&mut self, component: ComponentRef, configuration: Arc<ConfigurationMetadata>) -> NodeId {
        let id = ResolvedConfigurationIdentifier::new(
            self.components[component.0].id.clone(),
            configuration.name.clone(),
        );
        if let Some(&node) = self.node_index.get(&id) {
            return node;
        }
        let node = NodeId(self.nodes.len());
        let result_id = self.next_result_id();
        self.nodes.push(NodeState {
            result_id,
            id: id.clone(),
            component,
            metadata: configuration,
            incoming: IndexSet::new(),
            outgoing: IndexSet::new(),
            previous_exclusions: None,
            is_root: false,
        });
        self.node_index.insert(id, node);
        self.components[component.0].nodes.insert(node);
        node
    }

    /// Create the outgoing edges of `node` for its current incoming edges.
    ///
    /// Returns the edges created by this visit; an empty list when the node is
    /// skipped or its previous traversal still stands.
    pub fn visit_outgoing_dependencies(&mut self, node: NodeId) -> Vec<EdgeId> {
        let row = &self.nodes[node.0];
        if self.components[row.component.0].state != ModuleState::Selected {
            tracing::debug!("{} is not selected, ignoring", row.id);
            return Vec::new();
        }

        let transitive_incoming: Vec<EdgeId> = row
            .incoming
            .iter()
            .copied()
            .filter(|&edge| self.is_transitive(edge))
            .collect();
        if transitive_incoming.is_empty() && !row.is_root {
            if row.incoming.is_empty() {
                tracing::debug!("{} has no incoming edges, ignoring", row.id);
            } else {
                tracing::debug!("{} has no transitive incoming edges, ignoring outgoing edges", row.id);
            }
            if row.previous_exclusions.is_some() {
                self.remove_outgoing_edges(node);
            }
            return Vec::new();
        }

        let filter = self.resolution_filter(node, &transitive_incoming);
        let row = &mut self.nodes[node.0];
        if let Some(previous) = &row.previous_exclusions {
            if previous.excludes_same_modules_as(&filter) {
                tracing::debug!("{} was already traversed with equivalent exclusions, skipping", row.id);
                row.previous_exclusions = Some(filter);
                return Vec::new();
            }
            tracing::debug!("{} exclusions changed, retraversing", row.id);
            self.remove_outgoing_edges(node);
        }

        let configuration = Arc::clone(&self.nodes[node.0].metadata);
        let mut created = Vec::new();
        for dependency in &configuration.dependencies {
            if let Some(accept) = self.edge_filter {
                if !accept(dependency) {
                    continue;
                }
            }
            if filter.exclude_module(dependency.module()) {
                tracing::debug!(
                    "{} is excluded from {}",
                    dependency.requested,
                    self.nodes[node.0].id
                );
                continue;
            }
            let edge = self.create_edge(node, Arc::clone(dependency), &filter);
            self.nodes[node.0].outgoing.insert(edge);
            created.push(edge);
        }
        self.nodes[node.0].previous_exclusions = Some(filter);
        created
    }

    /// Union of what the transitive incoming edges exclude, narrowed by the
    /// node's own configuration excludes.
    fn resolution_filter(&self, node: NodeId, transitive_incoming: &[EdgeId]) -> ModuleExclusion {
        let mut edge_exclusions: Option<ModuleExclusion> = None;
        for edge in transitive_incoming {
            let exclusions = &self.edges[edge.0].exclusions;
            edge_exclusions = Some(match edge_exclusions {
                None => exclusions.clone(),
                Some(acc) => self.exclusions.union(&acc, exclusions),
            });
        }
        let edge_exclusions = edge_exclusions.unwrap_or_else(|| self.exclusions.exclude_none());
        let own = self
            .exclusions
            .exclude_any(&self.nodes[node.0].metadata.applicable_excludes());
        self.exclusions.intersect(&edge_exclusions, &own)
    }

    /// Detach every outgoing edge and forget the previous traversal.
    pub fn remove_outgoing_edges(&mut self, node: NodeId) {
        let outgoing: Vec<EdgeId> = self.nodes[node.0].outgoing.drain(..).collect();
        for edge in outgoing {
            self.remove_edge_from_targets(edge);
        }
        self.nodes[node.0].previous_exclusions = None;
    }

    /// The node's component lost its selection to a pending conflict.
    pub fn deselect_node(&mut self, node: NodeId) {
        if self.nodes[node.0].is_root {
            return;
        }
        self.remove_outgoing_edges(node);
    }

    /// Point whatever references this node at the conflict winner.
    pub fn restart_node(&mut self, node: NodeId, selected: ComponentRef) -> Result<(), GraftError> {
        if self.nodes[node.0].component == selected {
            self.on_more_selected(node);
            return Ok(());
        }
        let incoming: Vec<EdgeId> = self.nodes[node.0].incoming.iter().copied().collect();
        for edge in incoming {
            self.restart_edge(edge, selected)?;
        }
        self.nodes[node.0].incoming.clear();
        Ok(())
    }

    pub(super) fn add_incoming_edge(&mut self, node: NodeId, edge: EdgeId) {
        self.nodes[node.0].incoming.insert(edge);
        self.on_more_selected(node);
    }

    pub(super) fn remove_incoming_edge(&mut self, node: NodeId, edge: EdgeId) {
        self.nodes[node.0].incoming.shift_remove(&edge);
        self.on_fewer_selected(node);
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::super::DependencyGraphBuilder;
    use super::*;
    use crate::conflict::DefaultConflictHandler;

    #[test]
    fn unchanged_node_is_not_traversed_again() {
        let repo = fixtures::repository();
        let mut state = fixtures::state(&["org.a:a:1.0", "org.b:b:1.0"], &repo);
        let root = state.root();
        assert_eq!(fixtures::expand(&mut state, root).len(), 2);
        let a = fixtures::node(&state, "org.a:a:1.0");
        assert_eq!(fixtures::expand(&mut state, a).len(), 1);

        let edges = state.edges.len();
        assert!(state.visit_outgoing_dependencies(root).is_empty());
        assert!(state.visit_outgoing_dependencies(a).is_empty());
        assert_eq!(state.edges.len(), edges);
        assert_eq!(state.nodes[root.0].outgoing.len(), 2);
        assert_eq!(state.nodes[a.0].outgoing.len(), 1);
    }

    #[test]
    fn node_without_incoming_edges_drops_its_outgoing_edges() {
        let repo = fixtures::repository();
        let mut state = fixtures::state(&["org.a:a:1.0"], &repo);
        let root = state.root();
        fixtures::expand(&mut state, root);
        let a = fixtures::node(&state, "org.a:a:1.0");
        fixtures::expand(&mut state, a);
        let c = fixtures::node(&state, "org.c:c:1.0");
        assert!(state.nodes[c.0].is_selected());

        state.remove_outgoing_edges(root);
        assert!(!state.nodes[a.0].is_selected());
        assert!(state.visit_outgoing_dependencies(a).is_empty());
        assert!(state.nodes[a.0].outgoing.is_empty());
        assert!(state.nodes[a.0].previous_exclusions.is_none());
        assert!(!state.nodes[c.0].is_selected());
    }

    #[test]
    fn nodes_are_selected_exactly_when_live_edges_reach_them() {
        let repo = fixtures::repository();
        let mut state = fixtures::state(&["org.a:a:1.0", "org.w:w:1.0"], &repo);
        let mut builder = DependencyGraphBuilder::new(&repo, &repo, Box::new(DefaultConflictHandler::latest()));
        let report = builder.traverse_graph(&mut state).unwrap();
        state.check_quiescent().unwrap();
        assert_eq!(report.len(), 1);

        // c 1.0 lost to c 2.0, taking d and e with it.
        let mut selected: Vec<String> = state
            .nodes
            .iter()
            .filter(|n| n.is_selected())
            .map(|n| n.id.id.to_string())
            .collect();
        selected.sort();
        assert_eq!(
            selected,
            vec![
                "org.a:a:1.0",
                "org.c:c:2.0",
                "org.example:app:1.0",
                "org.w:w:1.0",
                "org.x:x:1.0",
                "org.y:y:1.0",
            ]
        );

        for node in &state.nodes {
            if node.is_selected() {
                assert_eq!(state.components[node.component.0].state, ModuleState::Selected, "{}", node.id.id);
                for edge in &node.incoming {
                    let from = &state.nodes[state.edges[edge.0].from.0];
                    assert!(from.is_selected(), "{} is reached from pruned {}", node.id.id, from.id.id);
                    assert!(state.edges[edge.0].targets.contains(&node_id(&state, node)));
                }
            } else {
                assert!(node.incoming.is_empty(), "{}", node.id.id);
                for edge in &node.outgoing {
                    assert!(state.edges[edge.0].targets.is_empty(), "{} still points somewhere", node.id.id);
                }
            }
        }
    }

    fn node_id(state: &ResolveState<'_>, node: &NodeState) -> NodeId {
        state.node_index[&node.id]
    }
}
