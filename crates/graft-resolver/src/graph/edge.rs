use graft_core::metadata::DependencyMetadata;
use graft_util::errors::GraftError;
use indexmap::IndexSet;
use std::sync::Arc;

use super::state::ResolveState;
use super::{ComponentRef, EdgeId, ModuleState, NodeId, SelectorId};
use crate::exclusions::ModuleExclusion;
use crate::resolvers::ModuleVersionResolveError;

/// A dependency declared by one node, pointing at the nodes it resolved to.
#[derive(Debug)]
pub(crate) struct EdgeState {
    pub from: NodeId,
    pub selector: SelectorId,
    pub dependency: Arc<DependencyMetadata>,
    /// What the target may not pull in: the dependency's own excludes plus
    /// everything excluded on the way to `from`.
    pub exclusions: ModuleExclusion,
    pub target: Option<ComponentRef>,
    pub targets: IndexSet<NodeId>,
    pub target_failure: Option<ModuleVersionResolveError>,
}

impl ResolveState<'_> {
    pub(super) fn create_edge(
        &mut self,
        from: NodeId,
        dependency: Arc<DependencyMetadata>,
        transitive_exclusions: &ModuleExclusion,
    ) -> EdgeId {
        let selector = self.get_selector(&dependency);
        let hierarchy = &self.nodes[from.0].metadata.hierarchy;
        let own = self.exclusions.exclude_any(&dependency.excludes_for(hierarchy));
        let exclusions = self.exclusions.intersect(&own, transitive_exclusions);
        let edge = EdgeId(self.edges.len());
        self.edges.push(EdgeState {
            from,
            selector,
            dependency,
            exclusions,
            target: None,
            targets: IndexSet::new(),
            target_failure: None,
        });
        edge
    }

    /// Whether the target of `edge` should pull in its own dependencies.
    pub(super) fn is_transitive(&self, edge: EdgeId) -> bool {
        let row = &self.edges[edge.0];
        row.dependency.transitive && self.nodes[row.from.0].metadata.transitive
    }

    /// Resolve the edge's selector on first use and register the edge as
    /// waiting on its target module.
    pub fn resolve_module_revision_id(&mut self, edge: EdgeId) -> Option<ComponentRef> {
        if self.edges[edge.0].target.is_none() {
            let selector = self.edges[edge.0].selector;
            let target = self.resolve_selector(selector);
            self.edges[edge.0].target = target;
            let module = self.selectors[selector.0].target_module;
            if let Ok(row) = self.module_mut(module) {
                row.unattached.insert(edge);
            }
        }
        self.edges[edge.0].target
    }

    /// Connect the edge to the configurations it selects on its target, if
    /// the target is currently selected.
    pub fn attach(&mut self, edge: EdgeId) -> Result<(), GraftError> {
        let Some(target) = self.edges[edge.0].target else {
            return Ok(());
        };
        if self.components[target.0].state != ModuleState::Selected {
            tracing::trace!(
                "{} -> {} waits, target is not selected",
                self.nodes[self.edges[edge.0].from.0].id,
                self.components[target.0].id
            );
            return Ok(());
        }
        self.calculate_target_configurations(edge, target);

        let targets: Vec<NodeId> = self.edges[edge.0].targets.iter().copied().collect();
        for node in &targets {
            self.add_incoming_edge(*node, edge);
        }
        if !targets.is_empty() {
            let module = self.selectors[self.edges[edge.0].selector.0].target_module;
            self.module_mut(module)?.unattached.shift_remove(&edge);
        }
        Ok(())
    }

    fn calculate_target_configurations(&mut self, edge: EdgeId, target: ComponentRef) {
        {
            let row = &mut self.edges[edge.0];
            row.targets.clear();
            row.target_failure = None;
        }
        let Some(metadata) = self.component_metadata(target) else {
            return;
        };
        let dependency = Arc::clone(&self.edges[edge.0].dependency);
        match dependency.select_configurations(&metadata) {
            Ok(configurations) => {
                for configuration in configurations {
                    let node = self.get_node(target, configuration);
                    self.edges[edge.0].targets.insert(node);
                }
            }
            Err(err) => {
                tracing::debug!("{err}");
                self.edges[edge.0].target_failure = Some(err.into());
            }
        }
    }

    /// Detach the edge from every node it points at.
    pub fn remove_edge_from_targets(&mut self, edge: EdgeId) {
        let targets: Vec<NodeId> = self.edges[edge.0].targets.drain(..).collect();
        for node in targets {
            self.remove_incoming_edge(node, edge);
        }
        self.edges[edge.0].target_failure = None;
        if self.edges[edge.0].target.is_some() {
            let module = self.selectors[self.edges[edge.0].selector.0].target_module;
            if let Ok(row) = self.module_mut(module) {
                row.unattached.shift_remove(&edge);
            }
        }
    }

    /// Move the edge onto the conflict winner.
    pub fn restart_edge(&mut self, edge: EdgeId, selected: ComponentRef) -> Result<(), GraftError> {
        self.remove_edge_from_targets(edge);
        self.edges[edge.0].target = Some(selected);
        self.attach(edge)
    }

    /// Send a late request for an evicted version to the module's winner.
    pub fn redirect_edge(&mut self, edge: EdgeId, winner: ComponentRef) {
        let selector = self.edges[edge.0].selector;
        self.edges[edge.0].target = Some(winner);
        self.selectors[selector.0].selected = Some(winner);
    }

    /// The first failure that stops this edge from resolving, if any.
    pub fn edge_failure(&self, edge: EdgeId) -> Option<&ModuleVersionResolveError> {
        let row = &self.edges[edge.0];
        if let Some(failure) = &self.selectors[row.selector.0].failure {
            return Some(failure);
        }
        if let Some(target) = row.target {
            if let Some(failure) = &self.components[target.0].failure {
                return Some(failure);
            }
        }
        row.target_failure.as_ref()
    }
}
