#![allow(dead_code)]

use graft_core::identifier::{ComponentIdentifier, ModuleVersionIdentifier, ModuleVersionSelector};
use graft_core::metadata::{ComponentResolveMetadata, ConfigurationDefinition, DependencyMetadata};
use graft_resolver::conflict::{ConflictHandler, ConflictReport, DefaultConflictHandler};
use graft_resolver::graph::{CompositeDependencyGraphVisitor, DependencyGraphBuilder, ResolveContext};
use graft_resolver::repository::FileRepository;
use graft_resolver::result::{
    ResolutionResult, ResolutionResultBuilder, ResolvedConfiguration, ResolvedConfigurationBuilder,
};
use std::sync::Arc;

pub fn dep(s: &str) -> DependencyMetadata {
    DependencyMetadata::new(ModuleVersionSelector::parse(s).unwrap())
}

pub fn mv(s: &str) -> ModuleVersionIdentifier {
    ModuleVersionIdentifier::parse(s).unwrap()
}

pub fn root_id() -> ModuleVersionIdentifier {
    ModuleVersionIdentifier::new("org.example", "app", "1.0")
}

/// A root component whose `compile` configuration declares `dependencies`.
pub fn root(dependencies: Vec<DependencyMetadata>) -> ResolveContext {
    let mut compile = ConfigurationDefinition::new("compile");
    for dependency in dependencies {
        compile = compile.dependency(dependency);
    }
    root_with(vec![compile], "compile")
}

pub fn root_with(definitions: Vec<ConfigurationDefinition>, configuration: &str) -> ResolveContext {
    let metadata = ComponentResolveMetadata::new(root_id(), ComponentIdentifier::Project(":app".into()), definitions).unwrap();
    ResolveContext::new(Arc::new(metadata), configuration)
}

pub fn repository(content: &str) -> Arc<FileRepository> {
    Arc::new(FileRepository::from_str(content, "/nonexistent").unwrap())
}

pub struct Outcome {
    pub configuration: ResolvedConfiguration,
    pub result: ResolutionResult,
    pub conflicts: ConflictReport,
}

impl Outcome {
    pub fn version_of(&self, group: &str, name: &str) -> Option<String> {
        self.configuration
            .find(group, name)
            .map(|d| d.module_version().version.clone())
    }
}

/// Resolve through the builder directly, with the given handler.
pub fn resolve_with(
    context: &ResolveContext,
    repository: &Arc<FileRepository>,
    handler: Box<dyn ConflictHandler + '_>,
    edge_filter: Option<&dyn Fn(&DependencyMetadata) -> bool>,
) -> Outcome {
    let mut legacy = ResolvedConfigurationBuilder::new(&context.configuration, repository.clone());
    let mut modern = ResolutionResultBuilder::new();
    let conflicts = {
        let mut visitor = CompositeDependencyGraphVisitor::new()
            .with(&mut legacy)
            .with(&mut modern);
        let mut builder = DependencyGraphBuilder::new(&**repository, &**repository, handler);
        if let Some(filter) = edge_filter {
            builder = builder.with_edge_filter(filter);
        }
        builder.resolve(context, &mut visitor).unwrap()
    };
    Outcome {
        configuration: legacy.build().unwrap(),
        result: modern.build(),
        conflicts,
    }
}

pub fn resolve(context: &ResolveContext, repository: &Arc<FileRepository>) -> Outcome {
    resolve_with(context, repository, Box::new(DefaultConflictHandler::latest()), None)
}
