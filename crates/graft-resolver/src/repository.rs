//! A component repository backed by a `repository.toml` file.
//!
//! ```toml
//! [[component]]
//! group = "org.a"
//! name = "a"
//! version = "1.0"
//!
//! [component.dependencies]
//! c = "org.c:c:1.0"
//! ```
//!
//! Component-level `dependencies` belong to the `default` configuration,
//! which also publishes `<name>.jar` unless it declares artifacts itself.
//! Artifact files live at `<group>/<name>/<version>/<artifact>-<version>[-classifier].<ext>`
//! next to `repository.toml`.

use graft_core::dependency::{ArtifactRequest, Dependency, Exclusion};
use graft_core::identifier::{ComponentIdentifier, ModuleIdentifier, ModuleVersionIdentifier};
use graft_core::metadata::{
    ComponentArtifactMetadata, ComponentResolveMetadata, ConfigurationDefinition, DependencyMetadata, IvyArtifactName,
};
use graft_core::DEFAULT_CONFIGURATION;
use graft_util::errors::GraftError;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::artifacts::ArtifactResolver;
use crate::resolvers::{
    ComponentIdResolveResult, ComponentMetaDataResolver, DependencyToComponentIdResolver, ModuleVersionResolveError,
};
use crate::version::VersionSelector;

#[derive(Debug, Deserialize)]
struct RepositoryFile {
    #[serde(default)]
    component: Vec<ComponentEntry>,
}

#[derive(Debug, Deserialize)]
struct ComponentEntry {
    group: String,
    name: String,
    version: String,
    /// Listed, but its metadata cannot be loaded.
    #[serde(default)]
    broken: bool,
    #[serde(default)]
    dependencies: BTreeMap<String, Dependency>,
    #[serde(default)]
    configurations: BTreeMap<String, ConfigurationEntry>,
}

#[derive(Debug, Deserialize)]
struct ConfigurationEntry {
    #[serde(default)]
    extends: Vec<String>,
    #[serde(default = "default_true")]
    transitive: bool,
    #[serde(default)]
    dependencies: BTreeMap<String, Dependency>,
    #[serde(default)]
    exclusions: Vec<Exclusion>,
    #[serde(default)]
    artifacts: Vec<ArtifactRequest>,
}

fn default_true() -> bool {
    true
}

type Stored = Result<Arc<ComponentResolveMetadata>, String>;

/// In-memory view of a repository directory.
#[derive(Debug)]
pub struct FileRepository {
    root: PathBuf,
    modules: IndexMap<ModuleIdentifier, IndexMap<String, Stored>>,
}

impl FileRepository {
    /// Load `repository.toml` from `path`.
    pub fn open(path: &Path) -> Result<Self, GraftError> {
        let content = graft_util::fs::read_to_string(path)?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_str(&content, root)
    }

    /// Parse repository contents; artifact files are looked up under `root`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str, root: impl Into<PathBuf>) -> Result<Self, GraftError> {
        let file: RepositoryFile = toml::from_str(content).map_err(|e| GraftError::Repository {
            message: format!("Failed to parse repository: {e}"),
        })?;
        let mut modules: IndexMap<ModuleIdentifier, IndexMap<String, Stored>> = IndexMap::new();
        for entry in file.component {
            let id = ModuleVersionIdentifier::new(&entry.group, &entry.name, &entry.version);
            let stored = if entry.broken {
                Err(format!("metadata of {id} is corrupt"))
            } else {
                Ok(Arc::new(build_metadata(&id, &entry)?))
            };
            let versions = modules.entry(id.module.clone()).or_default();
            if versions.insert(entry.version.clone(), stored).is_some() {
                return Err(GraftError::Repository {
                    message: format!("{id} is listed twice"),
                });
            }
        }
        tracing::debug!("loaded repository with {} modules", modules.len());
        Ok(Self {
            root: root.into(),
            modules,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Versions of `module` in declaration order.
    pub fn versions(&self, module: &ModuleIdentifier) -> Vec<&str> {
        self.modules
            .get(module)
            .map(|versions| versions.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Where the file of `artifact` is expected.
    pub fn artifact_path(&self, artifact: &ComponentArtifactMetadata) -> Option<PathBuf> {
        let ComponentIdentifier::Module(id) = &artifact.component else {
            return None;
        };
        let name = &artifact.name;
        let file = match &name.classifier {
            Some(classifier) => format!("{}-{}-{}.{}", name.name, id.version, classifier, name.extension),
            None => format!("{}-{}.{}", name.name, id.version, name.extension),
        };
        Some(
            self.root
                .join(id.group())
                .join(id.name())
                .join(&id.version)
                .join(file),
        )
    }
}

fn build_metadata(id: &ModuleVersionIdentifier, entry: &ComponentEntry) -> Result<ComponentResolveMetadata, GraftError> {
    let to_metadata = |deps: &BTreeMap<String, Dependency>| -> Result<Vec<DependencyMetadata>, GraftError> {
        deps.iter()
            .map(|(key, dep)| {
                dep.to_metadata(key).map_err(|e| GraftError::Metadata {
                    component: id.to_string(),
                    message: e.to_string(),
                })
            })
            .collect()
    };
    let to_artifact = |request: &ArtifactRequest| IvyArtifactName {
        name: request.name.clone().unwrap_or_else(|| id.name().to_string()),
        kind: request.kind.clone(),
        extension: request.extension.clone(),
        classifier: request.classifier.clone(),
    };

    let mut default = ConfigurationDefinition::new(DEFAULT_CONFIGURATION);
    default.dependencies = to_metadata(&entry.dependencies)?;
    let declares_default_artifacts = entry
        .configurations
        .get(DEFAULT_CONFIGURATION)
        .is_some_and(|c| !c.artifacts.is_empty());
    if !declares_default_artifacts {
        default = default.artifact(IvyArtifactName::jar(id.name()));
    }

    let mut definitions = vec![default];
    for (name, section) in &entry.configurations {
        let position = definitions.iter().position(|d| &d.name == name);
        let mut def = match position {
            Some(i) => definitions.remove(i),
            None => ConfigurationDefinition::new(name),
        };
        def.extends.extend(section.extends.iter().cloned());
        def.transitive = section.transitive;
        def.dependencies.extend(to_metadata(&section.dependencies)?);
        def.excludes.extend(section.exclusions.iter().map(Exclusion::to_exclude));
        def.artifacts.extend(section.artifacts.iter().map(to_artifact));
        match position {
            Some(i) => definitions.insert(i, def),
            None => definitions.push(def),
        }
    }

    ComponentResolveMetadata::new(id.clone(), ComponentIdentifier::Module(id.clone()), definitions)
}

impl DependencyToComponentIdResolver for FileRepository {
    fn resolve(&self, dependency: &DependencyMetadata) -> ComponentIdResolveResult {
        let requested = &dependency.requested;
        let Some(versions) = self.modules.get(&requested.module) else {
            return ComponentIdResolveResult::Failed(ModuleVersionResolveError::NotFound {
                selector: requested.clone(),
            });
        };

        let selector = VersionSelector::parse(&requested.version);
        if !selector.is_dynamic() {
            // Exact versions resolve without a listing; a missing one fails when its metadata is loaded.
            let id = ModuleVersionIdentifier::of(requested.module.clone(), &requested.version);
            return ComponentIdResolveResult::Resolved {
                id: ComponentIdentifier::Module(id.clone()),
                module_version: id,
                metadata: None,
            };
        }

        let Some(version) = selector.select(versions.keys().map(String::as_str)) else {
            return ComponentIdResolveResult::Failed(ModuleVersionResolveError::NotFound {
                selector: requested.clone(),
            });
        };
        let id = ModuleVersionIdentifier::of(requested.module.clone(), version);
        tracing::debug!("{requested} resolved to {id}");
        ComponentIdResolveResult::Resolved {
            id: ComponentIdentifier::Module(id.clone()),
            metadata: versions.get(version).and_then(|stored| stored.as_ref().ok().cloned()),
            module_version: id,
        }
    }
}

impl ComponentMetaDataResolver for FileRepository {
    fn resolve(&self, id: &ComponentIdentifier) -> Result<Arc<ComponentResolveMetadata>, ModuleVersionResolveError> {
        let ComponentIdentifier::Module(module_version) = id else {
            return Err(ModuleVersionResolveError::MissingComponent { component: id.clone() });
        };
        match self
            .modules
            .get(&module_version.module)
            .and_then(|versions| versions.get(&module_version.version))
        {
            Some(Ok(metadata)) => Ok(Arc::clone(metadata)),
            Some(Err(message)) => Err(ModuleVersionResolveError::Failed {
                target: id.to_string(),
                message: message.clone(),
            }),
            None => Err(ModuleVersionResolveError::MissingComponent { component: id.clone() }),
        }
    }
}

impl ArtifactResolver for FileRepository {
    fn resolve_artifact(&self, artifact: &ComponentArtifactMetadata) -> Result<PathBuf, ModuleVersionResolveError> {
        let missing = || ModuleVersionResolveError::Failed {
            target: artifact.to_string(),
            message: "artifact file not found".to_string(),
        };
        let path = self.artifact_path(artifact).ok_or_else(missing)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(missing())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::identifier::ModuleVersionSelector;

    const REPO: &str = r#"
[[component]]
group = "org.a"
name = "a"
version = "1.0"
[component.dependencies]
c = "org.c:c:1.0"

[[component]]
group = "org.c"
name = "c"
version = "1.0"

[[component]]
group = "org.c"
name = "c"
version = "2.0"
[component.configurations.runtime]
extends = ["default"]
artifacts = [{ classifier = "native" }]

[[component]]
group = "org.x"
name = "x"
version = "1.0"
broken = true
"#;

    fn repo() -> FileRepository {
        FileRepository::from_str(REPO, "/repo").unwrap()
    }

    fn dep(s: &str) -> DependencyMetadata {
        DependencyMetadata::new(ModuleVersionSelector::parse(s).unwrap())
    }

    #[test]
    fn metadata_has_default_configuration() {
        let repo = repo();
        let a = ComponentMetaDataResolver::resolve(&repo, &ComponentIdentifier::module("org.a", "a", "1.0")).unwrap();
        let default = a.configuration("default").unwrap();
        assert_eq!(default.dependencies.len(), 1);
        assert_eq!(default.artifacts[0].name.to_string(), "a.jar");
    }

    #[test]
    fn extra_configurations_extend_default() {
        let repo = repo();
        let c = ComponentMetaDataResolver::resolve(&repo, &ComponentIdentifier::module("org.c", "c", "2.0")).unwrap();
        let runtime = c.configuration("runtime").unwrap();
        let names: Vec<String> = runtime.artifacts.iter().map(|a| a.name.to_string()).collect();
        assert_eq!(names, vec!["c-native.jar", "c.jar"]);
    }

    #[test]
    fn dynamic_selectors_pick_highest() {
        let repo = repo();
        match DependencyToComponentIdResolver::resolve(&repo, &dep("org.c:c:latest.release")) {
            ComponentIdResolveResult::Resolved { module_version, metadata, .. } => {
                assert_eq!(module_version.version, "2.0");
                assert!(metadata.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_module_fails_selection() {
        let repo = repo();
        let result = DependencyToComponentIdResolver::resolve(&repo, &dep("org.d:d:1.0"));
        assert!(matches!(
            result,
            ComponentIdResolveResult::Failed(ModuleVersionResolveError::NotFound { .. })
        ));
    }

    #[test]
    fn missing_version_fails_metadata() {
        let repo = repo();
        let err = ComponentMetaDataResolver::resolve(&repo, &ComponentIdentifier::module("org.c", "c", "9.9")).unwrap_err();
        assert!(matches!(err, ModuleVersionResolveError::MissingComponent { .. }));
        let err = ComponentMetaDataResolver::resolve(&repo, &ComponentIdentifier::module("org.x", "x", "1.0")).unwrap_err();
        assert!(err.to_string().contains("corrupt"));
    }

    #[test]
    fn artifact_paths() {
        let repo = repo();
        let artifact = ComponentArtifactMetadata {
            component: ComponentIdentifier::module("org.c", "c", "2.0"),
            name: IvyArtifactName::jar("c").with_classifier("native"),
        };
        assert_eq!(
            repo.artifact_path(&artifact).unwrap(),
            PathBuf::from("/repo/org.c/c/2.0/c-2.0-native.jar")
        );
        assert!(repo.resolve_artifact(&artifact).is_err());
    }

    #[test]
    fn duplicate_components_are_rejected() {
        let content = r#"
[[component]]
group = "org.a"
name = "a"
version = "1.0"

[[component]]
group = "org.a"
name = "a"
version = "1.0"
"#;
        let err = FileRepository::from_str(content, "/repo").unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }
}
