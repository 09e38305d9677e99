use graft_util::errors::GraftError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::ResolutionSection;
use crate::dependency::{Dependency, Exclusion};
use crate::identifier::{ComponentIdentifier, ModuleVersionIdentifier};
use crate::metadata::{ComponentResolveMetadata, ConfigurationDefinition};

/// Configuration holding `[dependencies]`.
pub const COMPILE_CONFIGURATION: &str = "compile";
/// Configuration holding `[dev-dependencies]`; extends `compile`.
pub const TEST_CONFIGURATION: &str = "test";

/// The parsed representation of a `Graft.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub project: ProjectMetadata,

    #[serde(default)]
    pub repository: Option<RepositorySection>,

    #[serde(default)]
    pub resolution: Option<ResolutionSection>,

    #[serde(default)]
    pub dependencies: BTreeMap<String, Dependency>,

    #[serde(default, rename = "dev-dependencies")]
    pub dev_dependencies: BTreeMap<String, Dependency>,

    #[serde(default)]
    pub configurations: BTreeMap<String, ConfigurationSection>,
}

/// Project identity from the `[project]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub group: String,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_version() -> String {
    "unspecified".to_string()
}

/// Location of the component repository from `[repository]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySection {
    /// Path to `repository.toml`, relative to the manifest.
    pub path: PathBuf,
}

/// A configuration declared under `[configurations.<name>]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationSection {
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default = "default_true")]
    pub transitive: bool,
    #[serde(default)]
    pub dependencies: BTreeMap<String, Dependency>,
    #[serde(default)]
    pub exclusions: Vec<Exclusion>,
}

fn default_true() -> bool {
    true
}

impl Manifest {
    /// Load and parse a `Graft.toml` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = graft_util::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a `Graft.toml` from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            GraftError::Manifest {
                message: format!("Failed to parse Graft.toml: {e}"),
            }
            .into()
        })
    }

    /// Resolve the repository path against the manifest's directory.
    pub fn repository_path(&self, manifest_dir: &Path) -> Option<PathBuf> {
        self.repository.as_ref().map(|r| manifest_dir.join(&r.path))
    }

    pub fn module_version(&self) -> ModuleVersionIdentifier {
        ModuleVersionIdentifier::new(&self.project.group, &self.project.name, &self.project.version)
    }

    /// Build the root component the engine resolves from.
    ///
    /// `[dependencies]` land in `compile`, `[dev-dependencies]` in `test`
    /// (which extends `compile`); `[configurations.*]` sections add new
    /// configurations or extend these two.
    pub fn root_metadata(&self) -> miette::Result<ComponentResolveMetadata> {
        let mut compile = ConfigurationDefinition::new(COMPILE_CONFIGURATION);
        for (key, dep) in &self.dependencies {
            compile = compile.dependency(dep.to_metadata(key)?);
        }
        let mut test = ConfigurationDefinition::new(TEST_CONFIGURATION).extends(COMPILE_CONFIGURATION);
        for (key, dep) in &self.dev_dependencies {
            test = test.dependency(dep.to_metadata(key)?);
        }

        let mut definitions = vec![compile, test];
        for (name, section) in &self.configurations {
            let position = definitions.iter().position(|d| &d.name == name);
            let mut def = match position {
                Some(i) => definitions.remove(i),
                None => ConfigurationDefinition::new(name),
            };
            def.extends.extend(section.extends.iter().cloned());
            def.transitive = section.transitive;
            for (key, dep) in &section.dependencies {
                def = def.dependency(dep.to_metadata(key)?);
            }
            def.excludes
                .extend(section.exclusions.iter().map(Exclusion::to_exclude));
            match position {
                Some(i) => definitions.insert(i, def),
                None => definitions.push(def),
            }
        }

        let component_id = ComponentIdentifier::Project(format!(":{}", self.project.name));
        Ok(ComponentResolveMetadata::new(
            self.module_version(),
            component_id,
            definitions,
        )?)
    }
}
