//! Models built from a resolved graph.

mod legacy;
mod modern;
pub mod paths;

pub use legacy::{ResolvedConfiguration, ResolvedConfigurationBuilder, ResolvedDependency, UnresolvedDependency};
pub use modern::{
    ResolutionResult, ResolutionResultBuilder, ResolvedComponentResult, ResolvedDependencyResult,
    UnresolvedDependencyResult,
};
