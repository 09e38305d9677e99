use graft_core::identifier::{ComponentIdentifier, ModuleIdentifier, ModuleVersionIdentifier};
use graft_core::metadata::ComponentResolveMetadata;
use graft_util::errors::GraftError;
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;

use super::state::ResolveState;
use super::{ComponentRef, EdgeId, ModuleRef, ModuleState, NodeId, SelectorId};
use crate::resolvers::{ModuleVersionResolveError, SelectionReason};

/// Everything known about one module: its versions and who points at it.
#[derive(Debug)]
pub(crate) struct ModuleResolveState {
    pub id: ModuleIdentifier,
    pub versions: IndexMap<ModuleVersionIdentifier, ComponentRef>,
    /// Edges resolved to this module that are not attached to a node yet.
    pub unattached: IndexSet<EdgeId>,
    pub selectors: IndexSet<SelectorId>,
    pub selected: Option<ComponentRef>,
}

/// One version of a module.
#[derive(Debug)]
pub(crate) struct ComponentState {
    pub result_id: u64,
    pub module: ModuleRef,
    pub id: ModuleVersionIdentifier,
    pub component_id: Option<ComponentIdentifier>,
    pub metadata: Option<Arc<ComponentResolveMetadata>>,
    pub failure: Option<ModuleVersionResolveError>,
    pub state: ModuleState,
    pub reason: SelectionReason,
    /// The selector that first resolved to this component.
    pub selected_by: Option<SelectorId>,
    pub nodes: IndexSet<NodeId>,
}

impl ResolveState<'_> {
    pub fn get_module(&mut self, id: &ModuleIdentifier) -> ModuleRef {
        if let Some(index) = self.modules.get_index_of(id) {
            return ModuleRef(index);
        }
        let (index, _) = self.modules.insert_full(
            id.clone(),
            ModuleResolveState {
                id: id.clone(),
                versions: IndexMap::new(),
                unattached: IndexSet::new(),
                selectors: IndexSet::new(),
                selected: None,
            },
        );
        ModuleRef(index)
    }

    pub fn module(&self, module: ModuleRef) -> Result<&ModuleResolveState, GraftError> {
        self.modules
            .get_index(module.0)
            .map(|(_, row)| row)
            .ok_or_else(|| GraftError::illegal_state(format!("unknown module #{}", module.0)))
    }

    pub(super) fn module_mut(&mut self, module: ModuleRef) -> Result<&mut ModuleResolveState, GraftError> {
        self.modules
            .get_index_mut(module.0)
            .map(|(_, row)| row)
            .ok_or_else(|| GraftError::illegal_state(format!("unknown module #{}", module.0)))
    }

    /// The component for `id` within `module`, created in state `New` on first use.
    pub fn get_component(&mut self, module: ModuleRef, id: &ModuleVersionIdentifier) -> ComponentRef {
        if let Some((_, row)) = self.modules.get_index(module.0) {
            if let Some(&existing) = row.versions.get(id) {
                return existing;
            }
        }
        let component = ComponentRef(self.components.len());
        let result_id = self.next_result_id();
        self.components.push(ComponentState {
            result_id,
            module,
            id: id.clone(),
            component_id: None,
            metadata: None,
            failure: None,
            state: ModuleState::New,
            reason: SelectionReason::Requested,
            selected_by: None,
            nodes: IndexSet::new(),
        });
        if let Some((_, row)) = self.modules.get_index_mut(module.0) {
            row.versions.insert(id.clone(), component);
        }
        component
    }

    /// Make `component` the winner of `module`; every other version is evicted.
    pub fn select(&mut self, module: ModuleRef, component: ComponentRef) -> Result<(), GraftError> {
        let row = self.module_mut(module)?;
        if let Some(current) = row.selected {
            let id = row.id.clone();
            return Err(GraftError::illegal_state(format!(
                "{id} already has {} selected",
                self.components[current.0].id
            )));
        }
        row.selected = Some(component);
        let versions: Vec<ComponentRef> = row.versions.values().copied().collect();
        for version in versions {
            self.components[version.0].state = ModuleState::Evicted;
        }
        self.components[component.0].state = ModuleState::Selected;
        Ok(())
    }

    /// Forget the winner of `module`, putting every version in conflict.
    ///
    /// Returns the previous winner so its nodes can be deselected.
    pub fn clear_selection(&mut self, module: ModuleRef) -> Result<Option<ComponentRef>, GraftError> {
        let row = self.module_mut(module)?;
        let previous = row.selected.take();
        let versions: Vec<ComponentRef> = row.versions.values().copied().collect();
        for version in versions {
            self.components[version.0].state = ModuleState::Conflict;
        }
        Ok(previous)
    }

    /// Apply a conflict winner to `module` and move every reference onto it.
    pub fn restart_module(&mut self, module: ModuleRef, selected: ComponentRef) -> Result<(), GraftError> {
        self.select(module, selected)?;
        let row = self.module(module)?;
        let versions: Vec<ComponentRef> = row.versions.values().copied().collect();
        let selectors: Vec<SelectorId> = row.selectors.iter().copied().collect();
        let unattached: Vec<EdgeId> = row.unattached.iter().copied().collect();

        for version in versions {
            let nodes: Vec<NodeId> = self.components[version.0].nodes.iter().copied().collect();
            for node in nodes {
                self.restart_node(node, selected)?;
            }
        }

        let target_module = self.components[selected.0].module;
        for selector in selectors {
            let row = &mut self.selectors[selector.0];
            row.selected = Some(selected);
            row.target_module = target_module;
        }

        if !unattached.is_empty() {
            tracing::debug!(
                "restarting {} unattached edges to {}",
                unattached.len(),
                self.components[selected.0].id
            );
            for edge in unattached {
                self.restart_edge(edge, selected)?;
            }
            self.module_mut(module)?.unattached.clear();
        }
        Ok(())
    }

    /// Metadata of `component`, fetched on first use. Failures are recorded on the component.
    pub fn component_metadata(&mut self, component: ComponentRef) -> Option<Arc<ComponentResolveMetadata>> {
        let row = &self.components[component.0];
        if let Some(metadata) = &row.metadata {
            return Some(Arc::clone(metadata));
        }
        if row.failure.is_some() {
            return None;
        }
        let id = self.component_identifier(component);
        let result = self.metadata_resolver.resolve(&id);
        self.store_metadata(component, result)
    }

    pub(super) fn store_metadata(
        &mut self,
        component: ComponentRef,
        result: Result<Arc<ComponentResolveMetadata>, ModuleVersionResolveError>,
    ) -> Option<Arc<ComponentResolveMetadata>> {
        let row = &mut self.components[component.0];
        match result {
            Ok(metadata) => {
                row.metadata = Some(Arc::clone(&metadata));
                Some(metadata)
            }
            Err(err) => {
                tracing::debug!("could not load metadata for {}: {err}", row.id);
                row.failure = Some(err);
                None
            }
        }
    }
}
