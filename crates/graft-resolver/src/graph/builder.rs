use graft_core::identifier::ComponentIdentifier;
use graft_core::metadata::{ComponentResolveMetadata, DependencyMetadata};
use graft_util::errors::GraftResult;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::sync::Arc;

use super::state::{EdgeFilter, ResolveState};
use super::visitor::{DependencyGraphVisitor, NodeView, SelectorView};
use super::{ComponentRef, EdgeId, ModuleState, NodeId, SelectorId};
use crate::conflict::{
    CandidateModule, ConflictHandler, ConflictReport, ConflictResolutionResult,
    DirectDependencyForcingResolver, VersionConflict,
};
use crate::resolvers::{ComponentMetaDataResolver, DependencyToComponentIdResolver, SelectionReason};

/// What to resolve: a root component and one of its configurations.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    pub root: Arc<ComponentResolveMetadata>,
    pub configuration: String,
}

impl ResolveContext {
    pub fn new(root: Arc<ComponentResolveMetadata>, configuration: impl Into<String>) -> Self {
        Self {
            root,
            configuration: configuration.into(),
        }
    }
}

/// Builds the dependency graph of a root configuration.
///
/// A builder runs a single resolution: [`resolve`](Self::resolve) consumes
/// it together with its conflict handler.
pub struct DependencyGraphBuilder<'a> {
    id_resolver: &'a dyn DependencyToComponentIdResolver,
    metadata_resolver: &'a dyn ComponentMetaDataResolver,
    handler: Box<dyn ConflictHandler + 'a>,
    edge_filter: Option<EdgeFilter<'a>>,
    parallel_metadata: bool,
}

impl<'a> DependencyGraphBuilder<'a> {
    pub fn new(
        id_resolver: &'a dyn DependencyToComponentIdResolver,
        metadata_resolver: &'a dyn ComponentMetaDataResolver,
        handler: Box<dyn ConflictHandler + 'a>,
    ) -> Self {
        Self {
            id_resolver,
            metadata_resolver,
            handler,
            edge_filter: None,
            parallel_metadata: true,
        }
    }

    /// Only follow dependencies accepted by `filter`.
    pub fn with_edge_filter(mut self, filter: &'a dyn Fn(&DependencyMetadata) -> bool) -> Self {
        self.edge_filter = Some(filter);
        self
    }

    /// Fetch expensive metadata for sibling targets concurrently.
    pub fn parallel_metadata(mut self, enabled: bool) -> Self {
        self.parallel_metadata = enabled;
        self
    }

    /// Resolve the graph and hand it to `visitor`.
    pub fn resolve(
        mut self,
        context: &ResolveContext,
        visitor: &mut dyn DependencyGraphVisitor,
    ) -> GraftResult<ConflictReport> {
        self.handler
            .register_resolver(Box::new(DirectDependencyForcingResolver));

        let mut state = ResolveState::new(
            Arc::clone(&context.root),
            &context.configuration,
            self.id_resolver,
            self.metadata_resolver,
            self.edge_filter,
        )?;
        tracing::debug!("resolving {}", state.nodes[state.root().0].id);

        let conflicts = self.traverse_graph(&mut state)?;
        state.check_quiescent()?;

        let root_component = state.root_component();
        state.components[root_component.0].reason = SelectionReason::Root;

        assemble_result(&state, visitor);
        tracing::info!(
            "resolved {} with {} components and {} conflicts",
            context.configuration,
            state
                .components
                .iter()
                .filter(|c| c.state == ModuleState::Selected)
                .count(),
            conflicts.len()
        );
        Ok(conflicts)
    }

    pub(super) fn traverse_graph(&mut self, state: &mut ResolveState<'_>) -> GraftResult<ConflictReport> {
        let mut report = ConflictReport::new();
        let root = state.root();
        state.on_more_selected(root);

        loop {
            if let Some(node) = state.pop() {
                tracing::debug!("visiting configuration {}", state.nodes[node.0].id);
                let edges = state.visit_outgoing_dependencies(node);
                for &edge in &edges {
                    if let Some(component) = state.resolve_module_revision_id(edge) {
                        self.perform_selection(state, edge, component)?;
                    }
                }
                if self.parallel_metadata {
                    prefetch_metadata(state, &edges);
                }
                for edge in edges {
                    state.attach(edge)?;
                }
            } else if self.handler.has_conflicts() {
                let Some(result) = self.handler.resolve_next_conflict(&*state)? else {
                    continue;
                };
                report.add(self.apply_conflict_resolution(state, result)?);
            } else {
                break;
            }
        }
        Ok(report)
    }

    fn perform_selection(
        &mut self,
        state: &mut ResolveState<'_>,
        edge: EdgeId,
        component: ComponentRef,
    ) -> GraftResult<()> {
        let module = state.components[component.0].module;
        let current = state.components[component.0].state;
        if let Some(winner) = state.module(module)?.selected {
            if winner != component && current == ModuleState::Evicted {
                tracing::debug!(
                    "{} was requested after {} won, using the winner",
                    state.components[component.0].id,
                    state.components[winner.0].id
                );
                state.redirect_edge(edge, winner);
                return Ok(());
            }
        }
        if current != ModuleState::New {
            return Ok(());
        }

        let row = state.module(module)?;
        let candidate = CandidateModule {
            id: row.id.clone(),
            versions: row
                .versions
                .values()
                .map(|c| state.components[c.0].id.clone())
                .collect(),
        };
        let conflict = self.handler.register_module(candidate);
        if conflict.conflict_exists() {
            tracing::debug!(
                "found new conflicting module version {}",
                state.components[component.0].id
            );
            for participant in conflict.participants() {
                let participant = state.get_module(participant);
                if let Some(previous) = state.clear_selection(participant)? {
                    let nodes: Vec<NodeId> =
                        state.components[previous.0].nodes.iter().copied().collect();
                    for node in nodes {
                        state.deselect_node(node);
                    }
                }
            }
        } else {
            tracing::debug!("selecting new module version {}", state.components[component.0].id);
            state.select(module, component)?;
        }
        Ok(())
    }

    fn apply_conflict_resolution(
        &mut self,
        state: &mut ResolveState<'_>,
        result: ConflictResolutionResult,
    ) -> GraftResult<VersionConflict> {
        let selected = result.selected;
        let winner = state.components[selected.0].id.clone();
        tracing::debug!(
            "selected {} from conflicting versions {:?} ({})",
            winner,
            result
                .candidates
                .iter()
                .map(|c| c.id.to_string())
                .collect::<Vec<_>>(),
            result.reason
        );
        state.components[selected.0].reason = result.reason;
        for participant in &result.participants {
            let module = state.get_module(participant);
            state.restart_module(module, selected)?;
        }
        Ok(VersionConflict {
            module: winner.module.clone(),
            requested: result.requested,
            resolved: winner,
            reason: result.reason,
        })
    }
}

/// Fetch metadata for selected targets ahead of attachment.
///
/// Only worthwhile when more than one target is expensive; a single fetch is
/// left to happen lazily during attachment. Results are stored in edge order.
fn prefetch_metadata(state: &mut ResolveState<'_>, edges: &[EdgeId]) {
    let mut pending: IndexMap<ComponentRef, ComponentIdentifier> = IndexMap::new();
    for edge in edges {
        let Some(target) = state.edges[edge.0].target else {
            continue;
        };
        let row = &state.components[target.0];
        if row.state != ModuleState::Selected || row.metadata.is_some() || row.failure.is_some() {
            continue;
        }
        let id = state.component_identifier(target);
        if !state.metadata_resolver.is_fetching_metadata_cheap(&id) {
            pending.insert(target, id);
        }
    }
    if pending.len() < 2 {
        return;
    }

    tracing::debug!("fetching metadata for {} components in parallel", pending.len());
    let resolver = state.metadata_resolver;
    let fetched: Vec<_> = pending
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(component, id)| (component, resolver.resolve(&id)))
        .collect();
    for (component, result) in fetched {
        state.store_metadata(component, result);
    }
}

fn assemble_result(state: &ResolveState<'_>, visitor: &mut dyn DependencyGraphVisitor) {
    let selected: Vec<NodeId> = (0..state.nodes.len())
        .map(NodeId)
        .filter(|node| state.nodes[node.0].is_selected())
        .collect();

    visitor.start(NodeView::new(state, state.root()));
    for &node in &selected {
        visitor.visit_node(NodeView::new(state, node));
    }
    for selector in (0..state.selectors.len()).map(SelectorId) {
        visitor.visit_selector(SelectorView::new(state, selector));
    }
    for &node in &selected {
        visitor.visit_edges(NodeView::new(state, node));
    }
    visitor.finish(NodeView::new(state, state.root()));
}
