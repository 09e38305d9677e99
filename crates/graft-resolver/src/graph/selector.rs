use graft_core::metadata::DependencyMetadata;
use std::sync::Arc;

use super::state::ResolveState;
use super::{ComponentRef, ModuleRef, SelectorId};
use crate::resolvers::{ComponentIdResolveResult, ModuleVersionResolveError};

/// Memoized id resolution for one distinct requested selector.
#[derive(Debug)]
pub(crate) struct SelectorState {
    pub result_id: u64,
    /// The first dependency seen with this selector; used for id resolution.
    pub dependency: Arc<DependencyMetadata>,
    pub target_module: ModuleRef,
    pub selected: Option<ComponentRef>,
    pub failure: Option<ModuleVersionResolveError>,
}

impl ResolveState<'_> {
    pub(super) fn get_selector(&mut self, dependency: &Arc<DependencyMetadata>) -> SelectorId {
        if let Some(&selector) = self.selector_index.get(&dependency.requested) {
            return selector;
        }
        let target_module = self.get_module(dependency.module());
        let selector = SelectorId(self.selectors.len());
        let result_id = self.next_result_id();
        self.selectors.push(SelectorState {
            result_id,
            dependency: Arc::clone(dependency),
            target_module,
            selected: None,
            failure: None,
        });
        self.selector_index.insert(dependency.requested.clone(), selector);
        if let Ok(row) = self.module_mut(target_module) {
            row.selectors.insert(selector);
        }
        selector
    }

    /// The component this selector points at, resolving it on first use.
    ///
    /// Requests for the root's own module resolve to the root without asking
    /// the id resolver. Returns `None` when resolution failed; the failure
    /// stays on the selector.
    pub(super) fn resolve_selector(&mut self, selector: SelectorId) -> Option<ComponentRef> {
        let row = &self.selectors[selector.0];
        if row.selected.is_some() || row.failure.is_some() {
            return row.selected;
        }
        let dependency = Arc::clone(&row.dependency);
        let root_component = self.root_component();
        if self.components[root_component.0].module == row.target_module {
            tracing::debug!("{} points at the root module, using the root", dependency.requested);
            self.selectors[selector.0].selected = Some(root_component);
            return Some(root_component);
        }
        match self.id_resolver.resolve(&dependency) {
            ComponentIdResolveResult::Failed(err) => {
                tracing::debug!("could not resolve {}: {err}", dependency.requested);
                self.selectors[selector.0].failure = Some(err);
                None
            }
            ComponentIdResolveResult::Resolved {
                id,
                module_version,
                metadata,
            } => {
                let module = self.get_module(&module_version.module);
                let component = self.get_component(module, &module_version);
                let row = &mut self.components[component.0];
                row.component_id.get_or_insert(id);
                if row.metadata.is_none() {
                    row.metadata = metadata;
                }
                row.selected_by.get_or_insert(selector);

                let previous_module = self.selectors[selector.0].target_module;
                if previous_module != module {
                    if let Ok(previous) = self.module_mut(previous_module) {
                        previous.selectors.shift_remove(&selector);
                    }
                    if let Ok(target) = self.module_mut(module) {
                        target.selectors.insert(selector);
                    }
                }
                let row = &mut self.selectors[selector.0];
                row.selected = Some(component);
                row.target_module = module;
                tracing::trace!("{} resolved to {}", dependency.requested, module_version);
                Some(component)
            }
        }
    }
}
