//! Read-only views over a finished graph and the visitor that consumes them.

use graft_core::identifier::{
    ComponentIdentifier, ModuleVersionIdentifier, ModuleVersionSelector, ResolvedConfigurationIdentifier,
};
use graft_core::metadata::{ComponentResolveMetadata, ConfigurationMetadata, DependencyMetadata};
use std::fmt;
use std::sync::Arc;

use super::state::ResolveState;
use super::{ComponentRef, EdgeId, ModuleState, NodeId, SelectorId};
use crate::exclusions::ModuleExclusion;
use crate::resolvers::{ModuleVersionResolveError, SelectionReason};

/// Receives the resolved graph once traversal is complete.
///
/// Calls arrive in a fixed order: `start`, `visit_node` for each selected
/// node, `visit_selector` for each selector, `visit_edges` for each selected
/// node, then `finish`.
pub trait DependencyGraphVisitor {
    fn start(&mut self, root: NodeView<'_>);

    fn visit_node(&mut self, node: NodeView<'_>);

    fn visit_selector(&mut self, selector: SelectorView<'_>);

    fn visit_edges(&mut self, node: NodeView<'_>);

    fn finish(&mut self, root: NodeView<'_>);
}

/// Forwards every call to each delegate, in registration order.
#[derive(Default)]
pub struct CompositeDependencyGraphVisitor<'v> {
    delegates: Vec<&'v mut dyn DependencyGraphVisitor>,
}

impl<'v> CompositeDependencyGraphVisitor<'v> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, visitor: &'v mut dyn DependencyGraphVisitor) -> Self {
        self.delegates.push(visitor);
        self
    }
}

impl DependencyGraphVisitor for CompositeDependencyGraphVisitor<'_> {
    fn start(&mut self, root: NodeView<'_>) {
        for delegate in &mut self.delegates {
            delegate.start(root);
        }
    }

    fn visit_node(&mut self, node: NodeView<'_>) {
        for delegate in &mut self.delegates {
            delegate.visit_node(node);
        }
    }

    fn visit_selector(&mut self, selector: SelectorView<'_>) {
        for delegate in &mut self.delegates {
            delegate.visit_selector(selector);
        }
    }

    fn visit_edges(&mut self, node: NodeView<'_>) {
        for delegate in &mut self.delegates {
            delegate.visit_edges(node);
        }
    }

    fn finish(&mut self, root: NodeView<'_>) {
        for delegate in &mut self.delegates {
            delegate.finish(root);
        }
    }
}

/// A configuration node.
#[derive(Clone, Copy)]
pub struct NodeView<'g> {
    graph: &'g ResolveState<'g>,
    id: NodeId,
}

/// A component (module version) that owns nodes.
#[derive(Clone, Copy)]
pub struct ComponentView<'g> {
    graph: &'g ResolveState<'g>,
    id: ComponentRef,
}

/// A dependency edge between nodes.
#[derive(Clone, Copy)]
pub struct EdgeView<'g> {
    graph: &'g ResolveState<'g>,
    id: EdgeId,
}

/// A requested selector and what it resolved to.
#[derive(Clone, Copy)]
pub struct SelectorView<'g> {
    graph: &'g ResolveState<'g>,
    id: SelectorId,
}

impl<'g> NodeView<'g> {
    pub(crate) fn new(graph: &'g ResolveState<'g>, id: NodeId) -> Self {
        Self { graph, id }
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    /// Id shared with components and selectors; unique within one resolution.
    pub fn result_id(&self) -> u64 {
        self.graph.nodes[self.id.0].result_id
    }

    pub fn resolved_id(&self) -> &'g ResolvedConfigurationIdentifier {
        &self.graph.nodes[self.id.0].id
    }

    pub fn configuration(&self) -> &'g Arc<ConfigurationMetadata> {
        &self.graph.nodes[self.id.0].metadata
    }

    pub fn owner(&self) -> ComponentView<'g> {
        ComponentView {
            graph: self.graph,
            id: self.graph.nodes[self.id.0].component,
        }
    }

    pub fn is_root(&self) -> bool {
        self.graph.nodes[self.id.0].is_root
    }

    pub fn is_selected(&self) -> bool {
        self.graph.nodes[self.id.0].is_selected()
    }

    /// The filter the node was last traversed with.
    pub fn exclusions(&self) -> Option<&'g ModuleExclusion> {
        self.graph.nodes[self.id.0].previous_exclusions.as_ref()
    }

    pub fn incoming(&self) -> impl Iterator<Item = EdgeView<'g>> + 'g {
        let graph = self.graph;
        graph.nodes[self.id.0]
            .incoming
            .iter()
            .map(move |&id| EdgeView { graph, id })
    }

    pub fn outgoing(&self) -> impl Iterator<Item = EdgeView<'g>> + 'g {
        let graph = self.graph;
        graph.nodes[self.id.0]
            .outgoing
            .iter()
            .map(move |&id| EdgeView { graph, id })
    }
}

impl fmt::Debug for NodeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeView({})", self.resolved_id())
    }
}

impl<'g> ComponentView<'g> {
    pub fn component_ref(&self) -> ComponentRef {
        self.id
    }

    pub fn result_id(&self) -> u64 {
        self.graph.components[self.id.0].result_id
    }

    pub fn id(&self) -> &'g ModuleVersionIdentifier {
        &self.graph.components[self.id.0].id
    }

    /// The component id, falling back to the module version when none was reported.
    pub fn component_id(&self) -> ComponentIdentifier {
        self.graph.component_identifier(self.id)
    }

    pub fn metadata(&self) -> Option<&'g Arc<ComponentResolveMetadata>> {
        self.graph.components[self.id.0].metadata.as_ref()
    }

    pub fn state(&self) -> ModuleState {
        self.graph.components[self.id.0].state
    }

    pub fn reason(&self) -> SelectionReason {
        self.graph.components[self.id.0].reason
    }

    pub fn failure(&self) -> Option<&'g ModuleVersionResolveError> {
        self.graph.components[self.id.0].failure.as_ref()
    }

    /// Selected nodes of this component.
    pub fn nodes(&self) -> impl Iterator<Item = NodeView<'g>> + 'g {
        let graph = self.graph;
        graph.components[self.id.0]
            .nodes
            .iter()
            .filter(move |node| graph.nodes[node.0].is_selected())
            .map(move |&id| NodeView { graph, id })
    }
}

impl<'g> EdgeView<'g> {
    pub fn edge_id(&self) -> EdgeId {
        self.id
    }

    pub fn from(&self) -> NodeView<'g> {
        NodeView {
            graph: self.graph,
            id: self.graph.edges[self.id.0].from,
        }
    }

    /// Nodes this edge is attached to; empty when it failed or is not attached.
    pub fn targets(&self) -> impl Iterator<Item = NodeView<'g>> + 'g {
        let graph = self.graph;
        graph.edges[self.id.0]
            .targets
            .iter()
            .map(move |&id| NodeView { graph, id })
    }

    pub fn target_component(&self) -> Option<ComponentView<'g>> {
        self.graph.edges[self.id.0].target.map(|id| ComponentView {
            graph: self.graph,
            id,
        })
    }

    pub fn selector(&self) -> SelectorView<'g> {
        SelectorView {
            graph: self.graph,
            id: self.graph.edges[self.id.0].selector,
        }
    }

    pub fn dependency(&self) -> &'g DependencyMetadata {
        &self.graph.edges[self.id.0].dependency
    }

    pub fn requested(&self) -> &'g ModuleVersionSelector {
        &self.graph.edges[self.id.0].dependency.requested
    }

    pub fn exclusions(&self) -> &'g ModuleExclusion {
        &self.graph.edges[self.id.0].exclusions
    }

    pub fn failure(&self) -> Option<&'g ModuleVersionResolveError> {
        self.graph.edge_failure(self.id)
    }

    pub fn is_transitive(&self) -> bool {
        self.graph.is_transitive(self.id)
    }
}

impl fmt::Debug for EdgeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeView({} -> {})", self.from().resolved_id(), self.requested())
    }
}

impl<'g> SelectorView<'g> {
    pub(crate) fn new(graph: &'g ResolveState<'g>, id: SelectorId) -> Self {
        Self { graph, id }
    }

    pub fn selector_id(&self) -> SelectorId {
        self.id
    }

    pub fn result_id(&self) -> u64 {
        self.graph.selectors[self.id.0].result_id
    }

    pub fn requested(&self) -> &'g ModuleVersionSelector {
        &self.graph.selectors[self.id.0].dependency.requested
    }

    pub fn selected(&self) -> Option<ComponentView<'g>> {
        self.graph.selectors[self.id.0].selected.map(|id| ComponentView {
            graph: self.graph,
            id,
        })
    }

    pub fn failure(&self) -> Option<&'g ModuleVersionResolveError> {
        self.graph.selectors[self.id.0].failure.as_ref()
    }
}
