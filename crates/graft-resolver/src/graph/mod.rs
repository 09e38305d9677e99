//! The dependency graph engine.
//!
//! Every per-resolution object lives in one arena, [`state::ResolveState`],
//! and refers to the others through the typed indices below. Nodes and edges
//! are never freed while a resolution runs; they are detached and reattached
//! as conflicts are resolved.

mod builder;
mod edge;
mod module;
mod node;
mod selector;
mod state;
mod visitor;

#[cfg(test)]
mod fixtures;

pub use builder::{DependencyGraphBuilder, ResolveContext};
pub use visitor::{
    ComponentView, CompositeDependencyGraphVisitor, DependencyGraphVisitor, EdgeView, NodeView,
    SelectorView,
};

/// Index of a configuration node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Index of a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) usize);

/// Index of a component (one version of a module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentRef(pub(crate) usize);

/// Index of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleRef(pub(crate) usize);

/// Index of a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SelectorId(pub(crate) usize);

/// Selection state of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleState {
    /// Seen but not yet considered for selection.
    New,
    Selected,
    /// Waiting on a pending conflict.
    Conflict,
    /// Lost to another version of its module.
    Evicted,
}
