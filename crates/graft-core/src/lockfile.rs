use graft_util::errors::GraftError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Deterministic lockfile recording the selected version of every resolved module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lockfile {
    /// The root configuration that was resolved.
    #[serde(default)]
    pub configuration: String,
    #[serde(default)]
    pub module: Vec<LockedModule>,
}

/// A single locked module with its selected version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedModule {
    pub group: String,
    pub name: String,
    pub version: String,
    /// Why this version was selected (`requested`, `forced`, `conflict resolution`).
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<LockedDependencyRef>,
}

/// A reference to a direct dependency within the lockfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedDependencyRef {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl Lockfile {
    /// Load and parse a `Graft.lock` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = graft_util::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            GraftError::Generic {
                message: format!("Failed to parse lockfile: {e}"),
            }
            .into()
        })
    }

    /// Serialize the lockfile to a pretty-printed TOML string.
    pub fn to_string_pretty(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Find the locked entry for a module.
    pub fn find(&self, group: &str, name: &str) -> Option<&LockedModule> {
        self.module.iter().find(|m| m.group == group && m.name == name)
    }
}
