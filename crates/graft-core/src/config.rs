use graft_util::errors::GraftError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::identifier::ModuleIdentifier;

/// What to do when two versions of the same module meet in the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    /// Pick the highest version.
    #[default]
    Latest,
    /// Abort the resolution.
    Fail,
}

/// `[resolution]` settings as written in a file; unset keys fall through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionSection {
    #[serde(default, rename = "conflict-strategy")]
    pub conflict_strategy: Option<ConflictStrategy>,
    #[serde(default, rename = "parallel-metadata")]
    pub parallel_metadata: Option<bool>,
    #[serde(default)]
    pub replacements: BTreeMap<String, String>,
    #[serde(default, rename = "default-configuration")]
    pub default_configuration: Option<String>,
}

/// Effective resolution settings after layering global config and manifest.
#[derive(Debug, Clone)]
pub struct ResolutionConfig {
    pub conflict_strategy: ConflictStrategy,
    pub parallel_metadata: bool,
    /// Replaced module → replacing module.
    pub replacements: BTreeMap<ModuleIdentifier, ModuleIdentifier>,
    pub default_configuration: String,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            conflict_strategy: ConflictStrategy::Latest,
            parallel_metadata: true,
            replacements: BTreeMap::new(),
            default_configuration: "compile".to_string(),
        }
    }
}

impl ResolutionConfig {
    /// Layer `section` over the current values.
    pub fn apply(&mut self, section: &ResolutionSection) -> Result<(), GraftError> {
        if let Some(strategy) = section.conflict_strategy {
            self.conflict_strategy = strategy;
        }
        if let Some(parallel) = section.parallel_metadata {
            self.parallel_metadata = parallel;
        }
        if let Some(configuration) = &section.default_configuration {
            self.default_configuration = configuration.clone();
        }
        for (from, to) in &section.replacements {
            let parse = |s: &str| {
                ModuleIdentifier::parse(s).ok_or_else(|| GraftError::Manifest {
                    message: format!("replacement '{from}' = '{to}': expected \"group:name\" on both sides"),
                })
            };
            self.replacements.insert(parse(from)?, parse(to)?);
        }
        Ok(())
    }

    /// Defaults, then the global config, then the project's own section.
    pub fn layered(global: &GlobalConfig, project: Option<&ResolutionSection>) -> Result<Self, GraftError> {
        let mut config = Self::default();
        config.apply(&global.resolution)?;
        if let Some(section) = project {
            config.apply(section)?;
        }
        Ok(config)
    }
}

/// Global user configuration loaded from `~/.graft/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub resolution: ResolutionSection,
}

impl GlobalConfig {
    /// Load the global configuration from `~/.graft/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load from an explicit path, returning defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = graft_util::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            GraftError::Generic {
                message: format!("Failed to parse global config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the graft data directory (`~/.graft/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".graft")
}
