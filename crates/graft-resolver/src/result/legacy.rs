//! The flat resolved-configuration model: dependencies with their parents,
//! children and artifacts, plus unresolved dependencies.

use graft_core::identifier::{ModuleVersionIdentifier, ModuleVersionSelector, ResolvedConfigurationIdentifier};
use graft_core::lockfile::{LockedDependencyRef, LockedModule, Lockfile};
use graft_util::errors::GraftError;
use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::paths::PathCalculator;
use crate::artifacts::{ArtifactResolver, ArtifactSet, ArtifactSets, ResolvedArtifact};
use crate::graph::{DependencyGraphVisitor, NodeView, SelectorView};
use crate::resolvers::{ModuleVersionResolveError, SelectionReason};

/// One selected configuration of one module.
#[derive(Debug, Clone)]
pub struct ResolvedDependency {
    index: usize,
    pub id: ResolvedConfigurationIdentifier,
    pub reason: SelectionReason,
    parents: IndexSet<usize>,
    children: IndexSet<usize>,
    // Artifact sets pulled in by each parent.
    parent_artifacts: IndexMap<usize, IndexSet<usize>>,
}

impl ResolvedDependency {
    pub fn module_version(&self) -> &ModuleVersionIdentifier {
        &self.id.id
    }

    pub fn configuration(&self) -> &str {
        &self.id.configuration
    }
}

impl fmt::Display for ResolvedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A dependency that could not be resolved, with how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedDependency {
    pub selector: ModuleVersionSelector,
    pub failure: ModuleVersionResolveError,
    /// Shortest paths from the root to each component that declared it.
    pub paths: Vec<Vec<ModuleVersionIdentifier>>,
}

impl fmt::Display for UnresolvedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.failure)?;
        for path in &self.paths {
            let path: Vec<String> = path.iter().map(|p| p.to_string()).collect();
            write!(f, "\n    required by: {}", path.join(" > "))?;
        }
        Ok(())
    }
}

/// The resolved graph of one configuration in its flat form.
#[derive(Debug)]
pub struct ResolvedConfiguration {
    configuration: String,
    root: usize,
    dependencies: Vec<ResolvedDependency>,
    first_level: Vec<(ModuleVersionSelector, usize)>,
    unresolved: Vec<UnresolvedDependency>,
    artifact_sets: Vec<Arc<ArtifactSet>>,
}

impl ResolvedConfiguration {
    pub fn configuration(&self) -> &str {
        &self.configuration
    }

    pub fn root(&self) -> &ResolvedDependency {
        &self.dependencies[self.root]
    }

    pub fn has_error(&self) -> bool {
        !self.unresolved.is_empty()
    }

    pub fn unresolved(&self) -> &[UnresolvedDependency] {
        &self.unresolved
    }

    /// Fail with every unresolved dependency, if there are any.
    pub fn rethrow_failure(&self) -> Result<(), GraftError> {
        if self.unresolved.is_empty() {
            return Ok(());
        }
        let mut message = format!(
            "could not resolve all dependencies for configuration '{}'",
            self.configuration
        );
        for unresolved in &self.unresolved {
            message.push_str(&format!("\n  - {unresolved}"));
        }
        Err(GraftError::Resolution { message })
    }

    pub fn first_level_dependencies(&self) -> impl Iterator<Item = &ResolvedDependency> {
        self.first_level.iter().map(|(_, i)| &self.dependencies[*i])
    }

    /// First-level dependencies whose declared selector satisfies `spec`.
    pub fn first_level_dependencies_matching<'a>(
        &'a self,
        spec: impl Fn(&ModuleVersionSelector) -> bool + 'a,
    ) -> impl Iterator<Item = &'a ResolvedDependency> + 'a {
        self.first_level
            .iter()
            .filter(move |(selector, _)| spec(selector))
            .map(|(_, i)| &self.dependencies[*i])
    }

    /// Every resolved dependency, excluding the root.
    pub fn all_dependencies(&self) -> impl Iterator<Item = &ResolvedDependency> {
        self.dependencies.iter().filter(move |d| d.index != self.root)
    }

    pub fn find(&self, group: &str, name: &str) -> Option<&ResolvedDependency> {
        self.all_dependencies()
            .find(|d| d.module_version().group() == group && d.module_version().name() == name)
    }

    pub fn children<'a>(&'a self, dependency: &'a ResolvedDependency) -> impl Iterator<Item = &'a ResolvedDependency> {
        dependency.children.iter().map(|i| &self.dependencies[*i])
    }

    pub fn parents<'a>(&'a self, dependency: &'a ResolvedDependency) -> impl Iterator<Item = &'a ResolvedDependency> {
        dependency.parents.iter().map(|i| &self.dependencies[*i])
    }

    /// Artifacts of `dependency` as requested by `parent`.
    pub fn parent_artifacts(
        &self,
        dependency: &ResolvedDependency,
        parent: &ResolvedDependency,
    ) -> Result<Vec<ResolvedArtifact>, GraftError> {
        let Some(sets) = dependency.parent_artifacts.get(&parent.index) else {
            return Err(GraftError::Resolution {
                message: format!("{parent} is not a parent of {dependency}"),
            });
        };
        self.collect(sets.iter().copied())
    }

    /// Artifacts of `dependency` across all of its parents.
    pub fn module_artifacts(&self, dependency: &ResolvedDependency) -> Result<Vec<ResolvedArtifact>, GraftError> {
        self.collect(dependency.parent_artifacts.values().flatten().copied())
    }

    /// Every artifact of the configuration. Fails if anything is unresolved.
    pub fn artifacts(&self) -> Result<Vec<ResolvedArtifact>, GraftError> {
        self.rethrow_failure()?;
        self.collect(0..self.artifact_sets.len())
    }

    /// Files of every artifact, resolving them on first access.
    pub fn files(&self) -> Result<Vec<PathBuf>, GraftError> {
        self.artifacts()?
            .iter()
            .map(|artifact| {
                artifact
                    .file()
                    .map(|p| p.to_path_buf())
                    .map_err(|e| GraftError::Artifact {
                        message: e.to_string(),
                    })
            })
            .collect()
    }

    fn collect(&self, sets: impl Iterator<Item = usize>) -> Result<Vec<ResolvedArtifact>, GraftError> {
        let mut seen = IndexSet::new();
        let mut artifacts = Vec::new();
        for set in sets {
            let resolved = self.artifact_sets[set]
                .artifacts()
                .map_err(|e| GraftError::Artifact {
                    message: e.to_string(),
                })?;
            for artifact in resolved {
                if seen.insert(artifact.artifact.clone()) {
                    artifacts.push(artifact.clone());
                }
            }
        }
        Ok(artifacts)
    }

    /// A lockfile pinning every resolved module version.
    pub fn to_lockfile(&self) -> Lockfile {
        let mut modules: BTreeMap<(String, String), (ModuleVersionIdentifier, SelectionReason, BTreeSet<ModuleVersionIdentifier>)> =
            BTreeMap::new();
        for dependency in self.all_dependencies() {
            let id = dependency.module_version();
            let entry = modules
                .entry((id.group().to_string(), id.name().to_string()))
                .or_insert_with(|| (id.clone(), dependency.reason, BTreeSet::new()));
            for child in self.children(dependency) {
                entry.2.insert(child.module_version().clone());
            }
        }
        Lockfile {
            configuration: self.configuration.clone(),
            module: modules
                .into_values()
                .map(|(id, reason, children)| LockedModule {
                    group: id.group().to_string(),
                    name: id.name().to_string(),
                    version: id.version.clone(),
                    reason: Some(reason.to_string()),
                    dependencies: children
                        .into_iter()
                        .map(|c| LockedDependencyRef {
                            group: c.group().to_string(),
                            name: c.name().to_string(),
                            version: c.version,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Visitor that builds a [`ResolvedConfiguration`].
pub struct ResolvedConfigurationBuilder {
    configuration: String,
    root: Option<usize>,
    dependencies: Vec<ResolvedDependency>,
    by_node: HashMap<u64, usize>,
    first_level: Vec<(ModuleVersionSelector, usize)>,
    components: HashMap<u64, ModuleVersionIdentifier>,
    paths: Option<PathCalculator<u64>>,
    failures: Vec<(ModuleVersionSelector, ModuleVersionResolveError, u64)>,
    unresolved: IndexMap<ModuleVersionSelector, UnresolvedDependency>,
    artifact_sets: ArtifactSets,
}

impl ResolvedConfigurationBuilder {
    pub fn new(configuration: impl Into<String>, artifacts: Arc<dyn ArtifactResolver>) -> Self {
        Self {
            configuration: configuration.into(),
            root: None,
            dependencies: Vec::new(),
            by_node: HashMap::new(),
            first_level: Vec::new(),
            components: HashMap::new(),
            paths: None,
            failures: Vec::new(),
            unresolved: IndexMap::new(),
            artifact_sets: ArtifactSets::new(artifacts),
        }
    }

    pub fn build(self) -> Result<ResolvedConfiguration, GraftError> {
        let root = self.root.ok_or_else(|| GraftError::illegal_state("resolved configuration has no root"))?;
        Ok(ResolvedConfiguration {
            configuration: self.configuration,
            root,
            dependencies: self.dependencies,
            first_level: self.first_level,
            unresolved: self.unresolved.into_values().collect(),
            artifact_sets: self.artifact_sets.into_sets(),
        })
    }
}

impl DependencyGraphVisitor for ResolvedConfigurationBuilder {
    fn start(&mut self, root: NodeView<'_>) {
        self.paths = Some(PathCalculator::new(root.owner().result_id()));
    }

    fn visit_node(&mut self, node: NodeView<'_>) {
        let index = self.dependencies.len();
        let owner = node.owner();
        self.dependencies.push(ResolvedDependency {
            index,
            id: node.resolved_id().clone(),
            reason: owner.reason(),
            parents: IndexSet::new(),
            children: IndexSet::new(),
            parent_artifacts: IndexMap::new(),
        });
        self.by_node.insert(node.result_id(), index);
        self.components.insert(owner.result_id(), owner.id().clone());
        if node.is_root() {
            self.root = Some(index);
        }
    }

    fn visit_selector(&mut self, _selector: SelectorView<'_>) {}

    fn visit_edges(&mut self, node: NodeView<'_>) {
        let Some(&child) = self.by_node.get(&node.result_id()) else {
            return;
        };
        let owner = node.owner();
        for edge in node.incoming() {
            let from = edge.from();
            let Some(&parent) = self.by_node.get(&from.result_id()) else {
                continue;
            };
            self.dependencies[parent].children.insert(child);
            self.dependencies[child].parents.insert(parent);

            let set = self.artifact_sets.get_or_create(
                node.node_id(),
                owner.id(),
                &owner.component_id(),
                node.configuration(),
                &edge.dependency().artifacts,
                edge.exclusions(),
            );
            self.dependencies[child]
                .parent_artifacts
                .entry(parent)
                .or_default()
                .insert(set.id);

            if from.is_root() && !self.first_level.iter().any(|(_, i)| *i == child) {
                self.first_level.push((edge.requested().clone(), child));
            }
            if let Some(paths) = &mut self.paths {
                paths.add_dependent(owner.result_id(), from.owner().result_id());
            }
        }

        for edge in node.outgoing() {
            if let Some(failure) = edge.failure() {
                self.failures
                    .push((edge.requested().clone(), failure.clone(), owner.result_id()));
            }
        }
    }

    fn finish(&mut self, _root: NodeView<'_>) {
        let Some(mut paths) = self.paths.take() else {
            return;
        };
        for (selector, failure, from) in std::mem::take(&mut self.failures) {
            tracing::debug!("unresolved dependency {selector}: {failure}");
            let path: Vec<ModuleVersionIdentifier> = paths
                .path_to(&from)
                .unwrap_or_default()
                .iter()
                .filter_map(|c| self.components.get(c).cloned())
                .collect();
            let entry = self
                .unresolved
                .entry(selector.clone())
                .or_insert_with(|| UnresolvedDependency {
                    selector,
                    failure,
                    paths: Vec::new(),
                });
            if !entry.paths.contains(&path) {
                entry.paths.push(path);
            }
        }
    }
}
