//! Small repositories and root components for driving the arena directly.

use graft_core::identifier::{
    ComponentIdentifier, ModuleVersionIdentifier, ModuleVersionSelector, ResolvedConfigurationIdentifier,
};
use graft_core::metadata::{ComponentResolveMetadata, ConfigurationDefinition, DependencyMetadata};
use std::sync::Arc;

use super::state::ResolveState;
use super::{EdgeId, ModuleState, NodeId};
use crate::repository::FileRepository;

/// a -> c 1.0, b -> c 2.0, plus a longer route to c 2.0 through y and x.
/// c 1.0 pulls in d, which pulls in e.
pub(super) const REPOSITORY: &str = r#"
[[component]]
group = "org.a"
name = "a"
version = "1.0"
[component.dependencies]
c = "org.c:c:1.0"

[[component]]
group = "org.b"
name = "b"
version = "1.0"
[component.dependencies]
c = "org.c:c:2.0"

[[component]]
group = "org.w"
name = "w"
version = "1.0"
[component.dependencies]
y = "org.y:y:1.0"

[[component]]
group = "org.y"
name = "y"
version = "1.0"
[component.dependencies]
x = "org.x:x:1.0"

[[component]]
group = "org.x"
name = "x"
version = "1.0"
[component.dependencies]
c = "org.c:c:2.0"

[[component]]
group = "org.c"
name = "c"
version = "1.0"
[component.dependencies]
d = "org.d:d:1.0"

[[component]]
group = "org.c"
name = "c"
version = "2.0"

[[component]]
group = "org.d"
name = "d"
version = "1.0"
[component.dependencies]
e = "org.e:e:1.0"

[[component]]
group = "org.e"
name = "e"
version = "1.0"
"#;

pub(super) fn repository() -> FileRepository {
    FileRepository::from_str(REPOSITORY, "/nonexistent").unwrap()
}

/// Root `org.example:app:1.0` whose `compile` configuration declares `dependencies`.
pub(super) fn root(dependencies: &[&str]) -> Arc<ComponentResolveMetadata> {
    let mut compile = ConfigurationDefinition::new("compile");
    for d in dependencies {
        compile = compile.dependency(DependencyMetadata::new(ModuleVersionSelector::parse(d).unwrap()));
    }
    let metadata = ComponentResolveMetadata::new(
        ModuleVersionIdentifier::new("org.example", "app", "1.0"),
        ComponentIdentifier::Project(":app".into()),
        vec![compile],
    )
    .unwrap();
    Arc::new(metadata)
}

pub(super) fn state<'r>(dependencies: &[&str], repository: &'r FileRepository) -> ResolveState<'r> {
    ResolveState::new(root(dependencies), "compile", repository, repository, None).unwrap()
}

/// Visit `node` and attach what it points at, selecting every new version.
///
/// Only meant for graphs without conflicts.
pub(super) fn expand(state: &mut ResolveState<'_>, node: NodeId) -> Vec<EdgeId> {
    let edges = state.visit_outgoing_dependencies(node);
    for &edge in &edges {
        if let Some(component) = state.resolve_module_revision_id(edge) {
            if state.components[component.0].state == ModuleState::New {
                let module = state.components[component.0].module;
                state.select(module, component).unwrap();
            }
        }
    }
    for &edge in &edges {
        state.attach(edge).unwrap();
    }
    edges
}

/// The `default` node of `module_version`.
pub(super) fn node(state: &ResolveState<'_>, module_version: &str) -> NodeId {
    let id = ResolvedConfigurationIdentifier::new(ModuleVersionIdentifier::parse(module_version).unwrap(), "default");
    state.node_index[&id]
}
