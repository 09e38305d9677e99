use graft_util::errors::GraftError;
use serde::{Deserialize, Serialize};

use crate::identifier::ModuleVersionSelector;
use crate::metadata::{ArtifactPattern, DependencyMetadata, Exclude, IvyArtifactName, PatternMatcher, WILDCARD};

/// A dependency specification in Graft.toml.
///
/// Supports both shorthand (`"group:name:version"`) and detailed forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    Short(String),
    Detailed(DetailedDependency),
}

/// A dependency with explicit coordinates and optional resolution hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedDependency {
    pub group: String,
    /// Module name; defaults to the table key.
    #[serde(default)]
    pub name: Option<String>,
    pub version: String,
    /// Target configuration of the dependency; defaults to `default`.
    #[serde(default)]
    pub configuration: Option<String>,
    #[serde(default = "default_true")]
    pub transitive: bool,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub exclusions: Vec<Exclusion>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactRequest>,
}

fn default_true() -> bool {
    true
}

/// A transitive dependency or artifact to exclude.
///
/// Omitted fields match anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Exclusion {
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub artifact: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub matcher: PatternMatcher,
}

impl Exclusion {
    pub fn to_exclude(&self) -> Exclude {
        let any = |v: &Option<String>| v.clone().unwrap_or_else(|| WILDCARD.to_string());
        Exclude::artifact(
            any(&self.group),
            any(&self.module),
            ArtifactPattern {
                name: any(&self.artifact),
                kind: any(&self.kind),
                extension: any(&self.extension),
            },
        )
        .with_matcher(self.matcher)
    }
}

/// An explicitly requested artifact of a dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRequest {
    /// Artifact name; defaults to the module name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_jar", rename = "type")]
    pub kind: String,
    #[serde(default = "default_jar")]
    pub extension: String,
    #[serde(default)]
    pub classifier: Option<String>,
}

fn default_jar() -> String {
    "jar".to_string()
}

/// Coordinates parsed from a shorthand string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl Coordinate {
    /// Parse `"group:name:version"` into coordinates.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() == 3 && parts.iter().all(|p| !p.is_empty()) {
            Some(Self {
                group: parts[0].to_string(),
                name: parts[1].to_string(),
                version: parts[2].to_string(),
            })
        } else {
            None
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

impl Dependency {
    /// Convert the declaration under `key` into engine dependency metadata.
    pub fn to_metadata(&self, key: &str) -> Result<DependencyMetadata, GraftError> {
        match self {
            Dependency::Short(s) => {
                let c = Coordinate::parse(s).ok_or_else(|| GraftError::Manifest {
                    message: format!("dependency '{key}': expected \"group:name:version\", got \"{s}\""),
                })?;
                Ok(DependencyMetadata::new(ModuleVersionSelector::new(c.group, c.name, c.version)))
            }
            Dependency::Detailed(d) => {
                let name = d.name.clone().unwrap_or_else(|| key.to_string());
                let mut meta = DependencyMetadata::new(ModuleVersionSelector::new(&d.group, &name, &d.version));
                if let Some(configuration) = &d.configuration {
                    meta = meta.targeting(configuration);
                }
                meta.transitive = d.transitive;
                meta.force = d.force;
                meta.excludes = d.exclusions.iter().map(Exclusion::to_exclude).collect();
                meta.artifacts = d
                    .artifacts
                    .iter()
                    .map(|a| IvyArtifactName {
                        name: a.name.clone().unwrap_or_else(|| name.clone()),
                        kind: a.kind.clone(),
                        extension: a.extension.clone(),
                        classifier: a.classifier.clone(),
                    })
                    .collect();
                Ok(meta)
            }
        }
    }
}
