use graft_core::identifier::{
    ComponentIdentifier, ModuleIdentifier, ModuleVersionSelector, ResolvedConfigurationIdentifier,
};
use graft_core::metadata::{ComponentResolveMetadata, DependencyMetadata};
use graft_util::errors::GraftError;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use super::edge::EdgeState;
use super::module::{ComponentState, ModuleResolveState};
use super::node::NodeState;
use super::selector::SelectorState;
use super::{ComponentRef, ModuleState, NodeId, SelectorId};
use crate::conflict::{Candidate, CandidateSource};
use crate::exclusions::ModuleExclusions;
use crate::resolvers::{ComponentMetaDataResolver, DependencyToComponentIdResolver, SelectionReason};

pub(crate) type EdgeFilter<'r> = &'r dyn Fn(&DependencyMetadata) -> bool;

/// Arena holding everything one resolution knows about the graph.
pub(crate) struct ResolveState<'r> {
    pub(super) modules: IndexMap<ModuleIdentifier, ModuleResolveState>,
    pub(super) components: Vec<ComponentState>,
    pub(super) nodes: Vec<NodeState>,
    pub(super) node_index: HashMap<ResolvedConfigurationIdentifier, NodeId>,
    pub(super) edges: Vec<EdgeState>,
    pub(super) selectors: Vec<SelectorState>,
    pub(super) selector_index: HashMap<ModuleVersionSelector, SelectorId>,
    pub(super) root: NodeId,
    queue: VecDeque<NodeId>,
    queued: HashSet<NodeId>,
    pub(super) exclusions: ModuleExclusions,
    next_id: u64,
    pub(super) id_resolver: &'r dyn DependencyToComponentIdResolver,
    pub(super) metadata_resolver: &'r dyn ComponentMetaDataResolver,
    pub(super) edge_filter: Option<EdgeFilter<'r>>,
}

impl<'r> ResolveState<'r> {
    /// Create the arena with the root component selected and its node in place.
    pub fn new(
        root: Arc<ComponentResolveMetadata>,
        configuration: &str,
        id_resolver: &'r dyn DependencyToComponentIdResolver,
        metadata_resolver: &'r dyn ComponentMetaDataResolver,
        edge_filter: Option<EdgeFilter<'r>>,
    ) -> Result<Self, GraftError> {
        let root_configuration = root.configuration(configuration).cloned().ok_or_else(|| {
            GraftError::Resolution {
                message: format!(
                    "{} has no configuration named '{}'",
                    root.component_id, configuration
                ),
            }
        })?;

        let mut state = Self {
            modules: IndexMap::new(),
            components: Vec::new(),
            nodes: Vec::new(),
            node_index: HashMap::new(),
            edges: Vec::new(),
            selectors: Vec::new(),
            selector_index: HashMap::new(),
            root: NodeId(0),
            queue: VecDeque::new(),
            queued: HashSet::new(),
            exclusions: ModuleExclusions::new(),
            next_id: 0,
            id_resolver,
            metadata_resolver,
            edge_filter,
        };

        let module = state.get_module(&root.id.module);
        let component = state.get_component(module, &root.id);
        {
            let row = &mut state.components[component.0];
            row.component_id = Some(root.component_id.clone());
            row.metadata = Some(root);
            row.reason = SelectionReason::Root;
        }
        state.select(module, component)?;
        let node = state.get_node(component, root_configuration);
        state.nodes[node.0].is_root = true;
        state.root = node;
        Ok(state)
    }

    pub(super) fn next_result_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_component(&self) -> ComponentRef {
        self.nodes[self.root.0].component
    }

    /// Queue a node whose incoming edges grew; it goes to the back.
    pub fn on_more_selected(&mut self, node: NodeId) {
        if self.queued.insert(node) {
            tracing::trace!("queueing {} (more selected)", self.nodes[node.0].id);
            self.queue.push_back(node);
        }
    }

    /// Queue a node that lost an incoming edge; it jumps to the front.
    pub fn on_fewer_selected(&mut self, node: NodeId) {
        if self.queued.insert(node) {
            tracing::trace!("queueing {} (fewer selected)", self.nodes[node.0].id);
            self.queue.push_front(node);
        }
    }

    pub fn pop(&mut self) -> Option<NodeId> {
        let node = self.queue.pop_front()?;
        self.queued.remove(&node);
        Some(node)
    }

    /// Component id used to fetch metadata, falling back to the module version.
    pub(super) fn component_identifier(&self, component: ComponentRef) -> ComponentIdentifier {
        let row = &self.components[component.0];
        row.component_id
            .clone()
            .unwrap_or_else(|| ComponentIdentifier::Module(row.id.clone()))
    }

    /// Components targeted by a forced edge leaving the root component.
    fn forced_targets(&self) -> HashSet<ComponentRef> {
        let root_component = self.root_component();
        self.components[root_component.0]
            .nodes
            .iter()
            .flat_map(|node| self.nodes[node.0].outgoing.iter())
            .map(|edge| &self.edges[edge.0])
            .filter(|edge| edge.dependency.force)
            .filter_map(|edge| edge.target)
            .collect()
    }

    /// Check the arena invariants that must hold once traversal is finished.
    pub fn check_quiescent(&self) -> Result<(), GraftError> {
        for module in self.modules.values() {
            let selected: Vec<ComponentRef> = module
                .versions
                .values()
                .copied()
                .filter(|c| self.components[c.0].state == ModuleState::Selected)
                .collect();
            if selected.len() > 1 {
                return Err(GraftError::illegal_state(format!(
                    "{} has {} selected versions",
                    module.id,
                    selected.len()
                )));
            }
            if let Some(conflicted) = module
                .versions
                .values()
                .find(|c| self.components[c.0].state == ModuleState::Conflict)
            {
                return Err(GraftError::illegal_state(format!(
                    "{} is still in conflict",
                    self.components[conflicted.0].id
                )));
            }
        }
        Ok(())
    }
}

impl CandidateSource for ResolveState<'_> {
    fn candidates(&self, module: &ModuleIdentifier) -> Vec<Candidate> {
        let Some(row) = self.modules.get(module) else {
            return Vec::new();
        };
        let forced = self.forced_targets();
        row.versions
            .values()
            .map(|&component| Candidate {
                component,
                id: self.components[component.0].id.clone(),
                forced: forced.contains(&component),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    #[test]
    fn queued_nodes_are_not_queued_twice() {
        let repo = fixtures::repository();
        let mut state = fixtures::state(&["org.a:a:1.0", "org.b:b:1.0"], &repo);
        let root = state.root();
        state.on_more_selected(root);
        state.on_more_selected(root);
        state.on_fewer_selected(root);
        assert_eq!(state.pop(), Some(root));
        assert_eq!(state.pop(), None);

        fixtures::expand(&mut state, root);
        let a = fixtures::node(&state, "org.a:a:1.0");
        let b = fixtures::node(&state, "org.b:b:1.0");
        // Both are already waiting; neither call moves them.
        state.on_more_selected(a);
        state.on_fewer_selected(b);
        assert_eq!(state.pop(), Some(a));
        assert_eq!(state.pop(), Some(b));
        assert_eq!(state.pop(), None);
    }

    #[test]
    fn fewer_selected_nodes_jump_the_queue() {
        let repo = fixtures::repository();
        let mut state = fixtures::state(&["org.a:a:1.0", "org.b:b:1.0"], &repo);
        let root = state.root();
        fixtures::expand(&mut state, root);
        let a = fixtures::node(&state, "org.a:a:1.0");
        let b = fixtures::node(&state, "org.b:b:1.0");
        while state.pop().is_some() {}

        state.on_more_selected(a);
        state.on_more_selected(root);
        state.on_fewer_selected(b);
        assert_eq!(state.pop(), Some(b));
        assert_eq!(state.pop(), Some(a));
        assert_eq!(state.pop(), Some(root));
        assert_eq!(state.pop(), None);
    }

    #[test]
    fn root_starts_selected_and_unqueued() {
        let repo = fixtures::repository();
        let state = fixtures::state(&[], &repo);
        let root = state.root_component();
        assert_eq!(state.components[root.0].state, ModuleState::Selected);
        assert_eq!(state.components[root.0].reason, SelectionReason::Root);
        assert!(state.nodes[state.root().0].is_selected());
        assert!(state.check_quiescent().is_ok());
    }

    #[test]
    fn unknown_root_configuration_fails() {
        let repo = fixtures::repository();
        let result = ResolveState::new(fixtures::root(&[]), "runtime", &repo, &repo, None);
        let err = result.err().unwrap();
        assert!(err.to_string().contains("no configuration named 'runtime'"), "got: {err}");
    }
}
