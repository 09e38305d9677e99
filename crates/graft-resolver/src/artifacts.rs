//! Artifact sets and lazily resolved artifact files.

use graft_core::identifier::{ComponentIdentifier, ModuleVersionIdentifier};
use graft_core::metadata::{ComponentArtifactMetadata, ConfigurationMetadata, IvyArtifactName};
use once_cell::sync::OnceCell;
use once_cell::unsync;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::exclusions::ModuleExclusion;
use crate::graph::NodeId;
use crate::resolvers::ModuleVersionResolveError;

/// Locates artifact files. Called lazily, only when files are asked for.
pub trait ArtifactResolver: Send + Sync {
    fn resolve_artifact(&self, artifact: &ComponentArtifactMetadata) -> Result<PathBuf, ModuleVersionResolveError>;

    /// Artifacts published by `configuration` of `component`.
    fn resolve_module_artifacts(
        &self,
        _component: &ComponentIdentifier,
        configuration: &ConfigurationMetadata,
    ) -> Result<Vec<ComponentArtifactMetadata>, ModuleVersionResolveError> {
        Ok(configuration.artifacts.clone())
    }
}

/// An artifact file resolved on first access and remembered afterwards.
pub struct LazyFile {
    artifact: ComponentArtifactMetadata,
    resolver: Arc<dyn ArtifactResolver>,
    file: OnceCell<Result<PathBuf, ModuleVersionResolveError>>,
}

impl LazyFile {
    pub fn new(artifact: ComponentArtifactMetadata, resolver: Arc<dyn ArtifactResolver>) -> Self {
        Self {
            artifact,
            resolver,
            file: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Result<&Path, ModuleVersionResolveError> {
        match self
            .file
            .get_or_init(|| self.resolver.resolve_artifact(&self.artifact))
        {
            Ok(path) => Ok(path.as_path()),
            Err(err) => Err(err.clone()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.file.get().is_some()
    }
}

impl std::fmt::Debug for LazyFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyFile")
            .field("artifact", &self.artifact)
            .field("file", &self.file.get())
            .finish()
    }
}

/// One artifact of a resolved module.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub module: ModuleVersionIdentifier,
    pub artifact: ComponentArtifactMetadata,
    file: Arc<LazyFile>,
}

impl ResolvedArtifact {
    pub fn name(&self) -> &IvyArtifactName {
        &self.artifact.name
    }

    pub fn file(&self) -> Result<&Path, ModuleVersionResolveError> {
        self.file.get()
    }
}

/// The artifacts one edge pulls from one target node.
pub struct ArtifactSet {
    pub id: usize,
    module: ModuleVersionIdentifier,
    component: ComponentIdentifier,
    configuration: Arc<ConfigurationMetadata>,
    requested: Vec<IvyArtifactName>,
    exclusions: ModuleExclusion,
    resolver: Arc<dyn ArtifactResolver>,
    artifacts: unsync::OnceCell<Result<Vec<ResolvedArtifact>, ModuleVersionResolveError>>,
}

impl ArtifactSet {
    /// The set's artifacts, minus anything its exclusions remove.
    pub fn artifacts(&self) -> Result<&[ResolvedArtifact], ModuleVersionResolveError> {
        match self.artifacts.get_or_init(|| self.compute()) {
            Ok(artifacts) => Ok(artifacts),
            Err(err) => Err(err.clone()),
        }
    }

    fn compute(&self) -> Result<Vec<ResolvedArtifact>, ModuleVersionResolveError> {
        let candidates = if self.requested.is_empty() {
            self.resolver
                .resolve_module_artifacts(&self.component, &self.configuration)?
        } else {
            self.configuration.artifacts_for(&self.component, &self.requested)
        };
        Ok(candidates
            .into_iter()
            .filter(|artifact| {
                !self
                    .exclusions
                    .exclude_artifact(&self.module.module, &artifact.name)
            })
            .map(|artifact| ResolvedArtifact {
                module: self.module.clone(),
                file: Arc::new(LazyFile::new(artifact.clone(), Arc::clone(&self.resolver))),
                artifact,
            })
            .collect())
    }
}

impl std::fmt::Debug for ArtifactSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactSet")
            .field("id", &self.id)
            .field("module", &self.module)
            .field("configuration", &self.configuration.name)
            .field("requested", &self.requested)
            .finish()
    }
}

type ArtifactSetKey = (NodeId, Vec<IvyArtifactName>, ModuleExclusion);

/// Hands out one [`ArtifactSet`] per target node, requested artifacts and filter.
pub struct ArtifactSets {
    resolver: Arc<dyn ArtifactResolver>,
    index: HashMap<ArtifactSetKey, usize>,
    sets: Vec<Arc<ArtifactSet>>,
}

impl ArtifactSets {
    pub fn new(resolver: Arc<dyn ArtifactResolver>) -> Self {
        Self {
            resolver,
            index: HashMap::new(),
            sets: Vec::new(),
        }
    }

    /// The set for `node`, created on first request.
    pub fn get_or_create(
        &mut self,
        node: NodeId,
        module: &ModuleVersionIdentifier,
        component: &ComponentIdentifier,
        configuration: &Arc<ConfigurationMetadata>,
        requested: &[IvyArtifactName],
        exclusions: &ModuleExclusion,
    ) -> Arc<ArtifactSet> {
        // Filters that never touch artifacts share one set.
        let exclusions = if exclusions.may_exclude_artifacts() {
            exclusions.clone()
        } else {
            ModuleExclusion::ExcludeNone
        };
        let key = (node, requested.to_vec(), exclusions);
        if let Some(&id) = self.index.get(&key) {
            return Arc::clone(&self.sets[id]);
        }
        let id = self.sets.len();
        let set = Arc::new(ArtifactSet {
            id,
            module: module.clone(),
            component: component.clone(),
            configuration: Arc::clone(configuration),
            requested: key.1.clone(),
            exclusions: key.2.clone(),
            resolver: Arc::clone(&self.resolver),
            artifacts: unsync::OnceCell::new(),
        });
        self.sets.push(Arc::clone(&set));
        self.index.insert(key, id);
        set
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn into_sets(self) -> Vec<Arc<ArtifactSet>> {
        self.sets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::metadata::{ComponentResolveMetadata, ConfigurationDefinition, Exclude, ArtifactPattern};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl ArtifactResolver for Counting {
        fn resolve_artifact(&self, artifact: &ComponentArtifactMetadata) -> Result<PathBuf, ModuleVersionResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PathBuf::from(format!("/repo/{}", artifact.name)))
        }
    }

    fn component() -> ComponentResolveMetadata {
        ComponentResolveMetadata::new(
            ModuleVersionIdentifier::new("org.a", "a", "1.0"),
            ComponentIdentifier::module("org.a", "a", "1.0"),
            vec![ConfigurationDefinition::new("default")
                .artifact(IvyArtifactName::jar("a"))
                .artifact(IvyArtifactName::new("a", "source", "jar").with_classifier("sources"))],
        )
        .unwrap()
    }

    #[test]
    fn lazy_file_resolves_once() {
        let resolver = Arc::new(Counting::default());
        let artifact = ComponentArtifactMetadata {
            component: ComponentIdentifier::module("org.a", "a", "1.0"),
            name: IvyArtifactName::jar("a"),
        };
        let file = LazyFile::new(artifact, resolver.clone());
        assert!(!file.is_resolved());
        assert_eq!(file.get().unwrap(), Path::new("/repo/a.jar"));
        assert_eq!(file.get().unwrap(), Path::new("/repo/a.jar"));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sets_are_memoized_per_key() {
        let metadata = component();
        let configuration = metadata.configuration("default").unwrap();
        let mut sets = ArtifactSets::new(Arc::new(Counting::default()));
        let none = ModuleExclusion::ExcludeNone;
        let a = sets.get_or_create(NodeId(1), &metadata.id, &metadata.component_id, configuration, &[], &none);
        let b = sets.get_or_create(NodeId(1), &metadata.id, &metadata.component_id, configuration, &[], &none);
        assert_eq!(a.id, b.id);

        let module_only = ModuleExclusion::ModuleId(graft_core::identifier::ModuleIdentifier::new("org.x", "x"));
        let c = sets.get_or_create(NodeId(1), &metadata.id, &metadata.component_id, configuration, &[], &module_only);
        assert_eq!(a.id, c.id);

        let d = sets.get_or_create(
            NodeId(1),
            &metadata.id,
            &metadata.component_id,
            configuration,
            &[IvyArtifactName::jar("a")],
            &none,
        );
        assert_ne!(a.id, d.id);
        assert_eq!(sets.len(), 2);
    }

    #[test]
    fn artifact_exclusions_filter_the_set() {
        let metadata = component();
        let configuration = metadata.configuration("default").unwrap();
        let exclusions = crate::exclusions::ModuleExclusions::new().exclude_any(&[Exclude::artifact(
            "org.a",
            "a",
            ArtifactPattern {
                name: "*".into(),
                kind: "source".into(),
                extension: "*".into(),
            },
        )]);
        let mut sets = ArtifactSets::new(Arc::new(Counting::default()));
        let all = sets.get_or_create(
            NodeId(1),
            &metadata.id,
            &metadata.component_id,
            configuration,
            &[],
            &ModuleExclusion::ExcludeNone,
        );
        let filtered = sets.get_or_create(NodeId(1), &metadata.id, &metadata.component_id, configuration, &[], &exclusions);
        assert_eq!(all.artifacts().unwrap().len(), 2);
        let names: Vec<String> = filtered.artifacts().unwrap().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["a.jar"]);
    }
}
