use serde::{Deserialize, Serialize};
use std::fmt;

/// A module, independent of version: the key under which versions conflict.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleIdentifier {
    pub group: String,
    pub name: String,
}

impl ModuleIdentifier {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// Parse `"group:name"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (group, name) = s.split_once(':')?;
        if group.is_empty() || name.is_empty() || name.contains(':') {
            return None;
        }
        Some(Self::new(group, name))
    }
}

impl fmt::Display for ModuleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// A concrete version of a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleVersionIdentifier {
    pub module: ModuleIdentifier,
    pub version: String,
}

impl ModuleVersionIdentifier {
    pub fn new(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            module: ModuleIdentifier::new(group, name),
            version: version.into(),
        }
    }

    pub fn of(module: ModuleIdentifier, version: impl Into<String>) -> Self {
        Self {
            module,
            version: version.into(),
        }
    }

    pub fn group(&self) -> &str {
        &self.module.group
    }

    pub fn name(&self) -> &str {
        &self.module.name
    }

    /// Parse `"group:name:version"`.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [g, n, v] if !g.is_empty() && !n.is_empty() && !v.is_empty() => {
                Some(Self::new(*g, *n, *v))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ModuleVersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.version)
    }
}

/// Identity of a component in the graph.
///
/// Published modules are identified by their module version; the component
/// being resolved (the project) is identified by its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentIdentifier {
    Module(ModuleVersionIdentifier),
    Project(String),
}

impl ComponentIdentifier {
    pub fn module(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::Module(ModuleVersionIdentifier::new(group, name, version))
    }

    pub fn is_project(&self) -> bool {
        matches!(self, Self::Project(_))
    }
}

impl fmt::Display for ComponentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(id) => write!(f, "{id}"),
            Self::Project(path) => write!(f, "project {path}"),
        }
    }
}

/// A requested module and version constraint, as written in a dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleVersionSelector {
    pub module: ModuleIdentifier,
    pub version: String,
}

impl ModuleVersionSelector {
    pub fn new(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            module: ModuleIdentifier::new(group, name),
            version: version.into(),
        }
    }

    /// Parse `"group:name:version"`.
    pub fn parse(s: &str) -> Option<Self> {
        ModuleVersionIdentifier::parse(s).map(|id| Self {
            module: id.module,
            version: id.version,
        })
    }
}

impl fmt::Display for ModuleVersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.version)
    }
}

/// A configuration of a resolved module version: the identity of a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResolvedConfigurationIdentifier {
    pub id: ModuleVersionIdentifier,
    pub configuration: String,
}

impl ResolvedConfigurationIdentifier {
    pub fn new(id: ModuleVersionIdentifier, configuration: impl Into<String>) -> Self {
        Self {
            id,
            configuration: configuration.into(),
        }
    }
}

impl fmt::Display for ResolvedConfigurationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.id, self.configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn parse_module_identifier() {
        let id = ModuleIdentifier::parse("org.a:a").unwrap();
        assert_eq!(id.group, "org.a");
        assert_eq!(id.name, "a");
        assert!(ModuleIdentifier::parse("org.a").is_none());
        assert!(ModuleIdentifier::parse("org.a:a:1.0").is_none());
        assert!(ModuleIdentifier::parse(":a").is_none());
    }

    #[test]
    fn parse_selector_and_display() {
        let sel = ModuleVersionSelector::parse("org.c:c:[1.0,2.0)").unwrap();
        assert_eq!(sel.module, ModuleIdentifier::new("org.c", "c"));
        assert_eq!(sel.version, "[1.0,2.0)");
        assert_eq!(sel.to_string(), "org.c:c:[1.0,2.0)");
    }

    #[test]
    fn identifiers_are_hashable_values() {
        let mut set = HashSet::new();
        set.insert(ModuleVersionIdentifier::new("g", "n", "1.0"));
        set.insert(ModuleVersionIdentifier::new("g", "n", "1.0"));
        set.insert(ModuleVersionIdentifier::new("g", "n", "2.0"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn component_display() {
        assert_eq!(
            ComponentIdentifier::module("g", "n", "1.0").to_string(),
            "g:n:1.0"
        );
        assert_eq!(
            ComponentIdentifier::Project(":app".into()).to_string(),
            "project :app"
        );
    }

    #[test]
    fn configuration_identifier_display() {
        let id = ResolvedConfigurationIdentifier::new(
            ModuleVersionIdentifier::new("g", "n", "1.0"),
            "runtime",
        );
        assert_eq!(id.to_string(), "g:n:1.0(runtime)");
    }
}
