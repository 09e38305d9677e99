//! One-call resolution: wires the caching metadata resolver, the conflict
//! handler chosen by the configuration and both result models around a
//! [`DependencyGraphBuilder`].

use graft_core::config::{ConflictStrategy, GlobalConfig, ResolutionConfig};
use graft_core::manifest::Manifest;
use graft_util::errors::{GraftError, GraftResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::artifacts::ArtifactResolver;
use crate::cache::CachingMetaDataResolver;
use crate::conflict::{ConflictReport, DefaultConflictHandler, StrictConflictResolver};
use crate::graph::{CompositeDependencyGraphVisitor, DependencyGraphBuilder, ResolveContext};
use crate::repository::FileRepository;
use crate::resolvers::{ComponentMetaDataResolver, DependencyToComponentIdResolver};
use crate::result::{ResolutionResult, ResolutionResultBuilder, ResolvedConfiguration, ResolvedConfigurationBuilder};

/// Everything one resolution produces.
#[derive(Debug)]
pub struct Resolution {
    pub configuration: ResolvedConfiguration,
    pub result: ResolutionResult,
    pub conflicts: ConflictReport,
}

/// Resolve `context` against `repository` with the given settings.
///
/// Unresolved dependencies do not fail the call; check
/// [`ResolvedConfiguration::has_error`] or call `rethrow_failure`.
pub fn resolve<R>(context: &ResolveContext, config: &ResolutionConfig, repository: Arc<R>) -> GraftResult<Resolution>
where
    R: DependencyToComponentIdResolver + ComponentMetaDataResolver + ArtifactResolver + 'static,
{
    let metadata = CachingMetaDataResolver::new(Arc::clone(&repository));
    let handler = match config.conflict_strategy {
        ConflictStrategy::Latest => DefaultConflictHandler::latest(),
        ConflictStrategy::Fail => DefaultConflictHandler::new(Box::new(StrictConflictResolver)),
    }
    .with_replacements(config.replacements.clone());

    let artifacts: Arc<dyn ArtifactResolver> = repository.clone();
    let mut legacy = ResolvedConfigurationBuilder::new(&context.configuration, artifacts);
    let mut modern = ResolutionResultBuilder::new();

    let conflicts = {
        let mut visitor = CompositeDependencyGraphVisitor::new()
            .with(&mut legacy)
            .with(&mut modern);
        DependencyGraphBuilder::new(&*repository, &metadata, Box::new(handler))
            .parallel_metadata(config.parallel_metadata)
            .resolve(context, &mut visitor)?
    };
    tracing::debug!("fetched metadata for {} components", metadata.fetch_count());

    Ok(Resolution {
        configuration: legacy.build()?,
        result: modern.build(),
        conflicts,
    })
}

/// A project loaded from its `Graft.toml`, ready to resolve.
#[derive(Debug)]
pub struct Project {
    pub manifest: Manifest,
    pub root: PathBuf,
    pub config: ResolutionConfig,
    pub repository: Arc<FileRepository>,
}

impl Project {
    /// Load the manifest at `manifest_path` with the user's global config.
    pub fn load(manifest_path: &Path) -> GraftResult<Self> {
        Self::load_with(manifest_path, &GlobalConfig::load()?)
    }

    pub fn load_with(manifest_path: &Path, global: &GlobalConfig) -> GraftResult<Self> {
        let manifest = Manifest::from_path(manifest_path)?;
        let root = manifest_path.parent().map(Path::to_path_buf).unwrap_or_default();
        let config = ResolutionConfig::layered(global, manifest.resolution.as_ref())?;
        let repository_path = manifest.repository_path(&root).ok_or_else(|| GraftError::Repository {
            message: "Graft.toml has no [repository] section".to_string(),
        })?;
        let repository = Arc::new(FileRepository::open(&repository_path)?);
        Ok(Self {
            manifest,
            root,
            config,
            repository,
        })
    }

    /// Path of the lockfile written next to the manifest.
    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join("Graft.lock")
    }

    /// Resolve `configuration`, or the configured default when `None`.
    pub fn resolve(&self, configuration: Option<&str>) -> GraftResult<Resolution> {
        let configuration = configuration.unwrap_or(&self.config.default_configuration);
        let context = ResolveContext::new(Arc::new(self.manifest.root_metadata()?), configuration);
        resolve(&context, &self.config, Arc::clone(&self.repository))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPOSITORY: &str = r#"
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
group = "org.c"
name = "c"
version = "1.0"

[[component]]
group = "org.c"
name = "c"
version = "2.0"
"#;

    const MANIFEST: &str = r#"
[project]
group = "org.example"
name = "app"

[repository]
path = "repo/repository.toml"

[dependencies]
a = "org.a:a:1.0"
b = "org.b:b:1.0"
"#;

    fn project(manifest: &str) -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("repo")).unwrap();
        std::fs::write(dir.path().join("repo/repository.toml"), REPOSITORY).unwrap();
        std::fs::write(dir.path().join("Graft.toml"), manifest).unwrap();
        let project = Project::load_with(&dir.path().join("Graft.toml"), &GlobalConfig::default()).unwrap();
        (dir, project)
    }

    #[test]
    fn resolves_project_with_latest_strategy() {
        let (_dir, project) = project(MANIFEST);
        let resolution = project.resolve(None).unwrap();
        assert!(!resolution.configuration.has_error());
        let c = resolution.configuration.find("org.c", "c").unwrap();
        assert_eq!(c.module_version().version, "2.0");
        assert_eq!(resolution.conflicts.len(), 1);
        assert_eq!(resolution.result.components().len(), 4);
    }

    #[test]
    fn fail_strategy_aborts() {
        let manifest = format!("{MANIFEST}\n[resolution]\nconflict-strategy = \"fail\"\n");
        let (_dir, project) = project(&manifest);
        let err = project.resolve(None).unwrap_err();
        assert!(err.to_string().contains("version conflict"));
    }

    #[test]
    fn missing_repository_section() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Graft.toml"),
            "[project]\ngroup = \"org.example\"\nname = \"app\"\n",
        )
        .unwrap();
        let err = Project::load_with(&dir.path().join("Graft.toml"), &GlobalConfig::default()).unwrap_err();
        assert!(err.to_string().contains("[repository]"));
    }
}
