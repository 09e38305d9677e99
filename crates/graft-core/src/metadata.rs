use graft_util::errors::GraftError;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::identifier::{ComponentIdentifier, ModuleIdentifier, ModuleVersionIdentifier, ModuleVersionSelector};
use crate::DEFAULT_CONFIGURATION;

/// Matches any value in an exclude rule or artifact pattern.
pub const WILDCARD: &str = "*";

/// How the patterns of an exclude rule are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternMatcher {
    /// Literal comparison, `*` matches anything.
    #[default]
    Exact,
    /// Shell-style glob patterns.
    Glob,
}

/// The name of a published artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IvyArtifactName {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub extension: String,
    #[serde(default)]
    pub classifier: Option<String>,
}

impl IvyArtifactName {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            extension: extension.into(),
            classifier: None,
        }
    }

    /// A `jar` artifact with the given name.
    pub fn jar(name: impl Into<String>) -> Self {
        Self::new(name, "jar", "jar")
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }
}

impl fmt::Display for IvyArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(classifier) = &self.classifier {
            write!(f, "-{classifier}")?;
        }
        write!(f, ".{}", self.extension)
    }
}

/// An artifact belonging to a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentArtifactMetadata {
    pub component: ComponentIdentifier,
    pub name: IvyArtifactName,
}

impl fmt::Display for ComponentArtifactMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.component)
    }
}

/// Artifact name/type/extension pattern of an exclude rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactPattern {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub extension: String,
}

impl ArtifactPattern {
    pub fn any() -> Self {
        Self {
            name: WILDCARD.to_string(),
            kind: WILDCARD.to_string(),
            extension: WILDCARD.to_string(),
        }
    }

    pub fn is_any(&self) -> bool {
        self.name == WILDCARD && self.kind == WILDCARD && self.extension == WILDCARD
    }
}

impl Default for ArtifactPattern {
    fn default() -> Self {
        Self::any()
    }
}

/// A declared exclude rule.
///
/// A rule whose artifact pattern is `*:*:*` excludes whole modules; any other
/// rule only removes matching artifacts. `configurations` restricts the rule
/// to dependencies declared in those configurations (empty means all).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Exclude {
    pub group: String,
    pub module: String,
    pub artifact: ArtifactPattern,
    pub matcher: PatternMatcher,
    pub configurations: Vec<String>,
}

impl Exclude {
    /// Exclude modules matching `group:module` (`*` matches anything).
    pub fn module(group: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            module: module.into(),
            artifact: ArtifactPattern::any(),
            matcher: PatternMatcher::Exact,
            configurations: Vec::new(),
        }
    }

    /// Exclude matching artifacts of modules matching `group:module`.
    pub fn artifact(group: impl Into<String>, module: impl Into<String>, artifact: ArtifactPattern) -> Self {
        Self {
            artifact,
            ..Self::module(group, module)
        }
    }

    pub fn with_matcher(mut self, matcher: PatternMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn in_configurations(mut self, configurations: Vec<String>) -> Self {
        self.configurations = configurations;
        self
    }

    pub fn is_module_wide(&self) -> bool {
        self.artifact.is_any()
    }

    /// Whether this rule applies to a configuration with the given hierarchy.
    pub fn applies_to(&self, hierarchy: &[String]) -> bool {
        self.configurations.is_empty() || self.configurations.iter().any(|c| hierarchy.contains(c))
    }
}

/// A requested target configuration does not exist on the target component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{component} has no configuration named '{configuration}'")]
pub struct ConfigurationNotFound {
    pub component: ComponentIdentifier,
    pub configuration: String,
}

/// A dependency declared by a configuration of a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyMetadata {
    pub requested: ModuleVersionSelector,
    /// The configuration of the declaring component this dependency belongs to.
    pub module_configuration: String,
    /// Configurations of the target to depend on; empty means `default`.
    pub target_configurations: Vec<String>,
    pub transitive: bool,
    pub force: bool,
    pub excludes: Vec<Exclude>,
    /// Explicitly requested artifacts; empty means the target configuration's artifacts.
    pub artifacts: Vec<IvyArtifactName>,
}

impl DependencyMetadata {
    pub fn new(requested: ModuleVersionSelector) -> Self {
        Self {
            requested,
            module_configuration: DEFAULT_CONFIGURATION.to_string(),
            target_configurations: Vec::new(),
            transitive: true,
            force: false,
            excludes: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn module(&self) -> &ModuleIdentifier {
        &self.requested.module
    }

    pub fn targeting(mut self, configuration: impl Into<String>) -> Self {
        self.target_configurations.push(configuration.into());
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn non_transitive(mut self) -> Self {
        self.transitive = false;
        self
    }

    pub fn excluding(mut self, exclude: Exclude) -> Self {
        self.excludes.push(exclude);
        self
    }

    pub fn with_artifact(mut self, artifact: IvyArtifactName) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// Exclude rules that apply when traversing from a configuration with `hierarchy`.
    pub fn excludes_for(&self, hierarchy: &[String]) -> Vec<Exclude> {
        self.excludes
            .iter()
            .filter(|e| e.applies_to(hierarchy))
            .cloned()
            .collect()
    }

    /// Pick the configurations of `target` this dependency points at.
    pub fn select_configurations(
        &self,
        target: &ComponentResolveMetadata,
    ) -> Result<Vec<Arc<ConfigurationMetadata>>, ConfigurationNotFound> {
        if self.target_configurations.is_empty() {
            return lookup(target, DEFAULT_CONFIGURATION).map(|c| vec![c]);
        }
        self.target_configurations
            .iter()
            .map(|name| lookup(target, name))
            .collect()
    }
}

fn lookup(target: &ComponentResolveMetadata, name: &str) -> Result<Arc<ConfigurationMetadata>, ConfigurationNotFound> {
    target
        .configuration(name)
        .cloned()
        .ok_or_else(|| ConfigurationNotFound {
            component: target.component_id.clone(),
            configuration: name.to_string(),
        })
}

/// A configuration as declared, before its hierarchy is flattened.
#[derive(Debug, Clone)]
pub struct ConfigurationDefinition {
    pub name: String,
    pub extends: Vec<String>,
    pub transitive: bool,
    pub dependencies: Vec<DependencyMetadata>,
    pub excludes: Vec<Exclude>,
    pub artifacts: Vec<IvyArtifactName>,
}

impl ConfigurationDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends: Vec::new(),
            transitive: true,
            dependencies: Vec::new(),
            excludes: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends.push(parent.into());
        self
    }

    pub fn non_transitive(mut self) -> Self {
        self.transitive = false;
        self
    }

    pub fn dependency(mut self, dependency: DependencyMetadata) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn exclude(mut self, exclude: Exclude) -> Self {
        self.excludes.push(exclude);
        self
    }

    pub fn artifact(mut self, artifact: IvyArtifactName) -> Self {
        self.artifacts.push(artifact);
        self
    }
}

/// A configuration of a component with its hierarchy flattened.
#[derive(Debug, Clone)]
pub struct ConfigurationMetadata {
    pub name: String,
    /// This configuration followed by every configuration it extends.
    pub hierarchy: Vec<String>,
    pub transitive: bool,
    pub dependencies: Vec<Arc<DependencyMetadata>>,
    pub excludes: Vec<Exclude>,
    pub artifacts: Vec<ComponentArtifactMetadata>,
}

impl ConfigurationMetadata {
    /// Exclude rules declared by this configuration or its ancestors.
    pub fn applicable_excludes(&self) -> Vec<Exclude> {
        self.excludes
            .iter()
            .filter(|e| e.applies_to(&self.hierarchy))
            .cloned()
            .collect()
    }

    /// Resolve requested artifact names to artifacts of `component`.
    pub fn artifacts_for(
        &self,
        component: &ComponentIdentifier,
        requested: &[IvyArtifactName],
    ) -> Vec<ComponentArtifactMetadata> {
        if requested.is_empty() {
            return self.artifacts.clone();
        }
        requested
            .iter()
            .map(|name| ComponentArtifactMetadata {
                component: component.clone(),
                name: name.clone(),
            })
            .collect()
    }
}

/// Everything known about one component: its identity and configurations.
#[derive(Debug, Clone)]
pub struct ComponentResolveMetadata {
    pub id: ModuleVersionIdentifier,
    pub component_id: ComponentIdentifier,
    configurations: IndexMap<String, Arc<ConfigurationMetadata>>,
}

impl ComponentResolveMetadata {
    /// Build metadata from declared configurations, flattening `extends`.
    ///
    /// Fails if a configuration is declared twice, extends an unknown
    /// configuration, or takes part in an inheritance cycle.
    pub fn new(
        id: ModuleVersionIdentifier,
        component_id: ComponentIdentifier,
        definitions: Vec<ConfigurationDefinition>,
    ) -> Result<Self, GraftError> {
        let fail = |message: String| GraftError::Metadata {
            component: component_id.to_string(),
            message,
        };

        let mut defs: IndexMap<String, ConfigurationDefinition> = IndexMap::new();
        for def in definitions {
            if defs.contains_key(&def.name) {
                return Err(fail(format!("configuration '{}' is declared twice", def.name)));
            }
            defs.insert(def.name.clone(), def);
        }

        let mut hierarchies: IndexMap<String, Vec<String>> = IndexMap::new();
        for name in defs.keys() {
            let mut stack = Vec::new();
            let hierarchy = flatten(name, &defs, &mut hierarchies, &mut stack).map_err(fail)?;
            hierarchies.insert(name.clone(), hierarchy);
        }

        // Declared rows are shared between every configuration that inherits them.
        let declared: IndexMap<&str, Vec<Arc<DependencyMetadata>>> = defs
            .values()
            .map(|def| {
                let deps = def
                    .dependencies
                    .iter()
                    .map(|d| {
                        Arc::new(DependencyMetadata {
                            module_configuration: def.name.clone(),
                            ..d.clone()
                        })
                    })
                    .collect();
                (def.name.as_str(), deps)
            })
            .collect();

        let mut configurations = IndexMap::new();
        for (name, def) in &defs {
            let hierarchy = hierarchies[name].clone();
            let mut dependencies = Vec::new();
            let mut excludes = Vec::new();
            let mut artifacts = IndexSet::new();
            for ancestor in &hierarchy {
                let ancestor_def = &defs[ancestor];
                dependencies.extend(declared[ancestor.as_str()].iter().cloned());
                excludes.extend(ancestor_def.excludes.iter().cloned());
                for artifact in &ancestor_def.artifacts {
                    artifacts.insert(ComponentArtifactMetadata {
                        component: component_id.clone(),
                        name: artifact.clone(),
                    });
                }
            }
            configurations.insert(
                name.clone(),
                Arc::new(ConfigurationMetadata {
                    name: name.clone(),
                    hierarchy,
                    transitive: def.transitive,
                    dependencies,
                    excludes,
                    artifacts: artifacts.into_iter().collect(),
                }),
            );
        }

        Ok(Self {
            id,
            component_id,
            configurations,
        })
    }

    pub fn configuration(&self, name: &str) -> Option<&Arc<ConfigurationMetadata>> {
        self.configurations.get(name)
    }

    pub fn configuration_names(&self) -> impl Iterator<Item = &str> {
        self.configurations.keys().map(String::as_str)
    }
}

fn flatten(
    name: &str,
    defs: &IndexMap<String, ConfigurationDefinition>,
    done: &mut IndexMap<String, Vec<String>>,
    stack: &mut Vec<String>,
) -> Result<Vec<String>, String> {
    if let Some(hierarchy) = done.get(name) {
        return Ok(hierarchy.clone());
    }
    if stack.iter().any(|s| s == name) {
        stack.push(name.to_string());
        return Err(format!("configuration hierarchy cycle: {}", stack.join(" -> ")));
    }
    let def = defs
        .get(name)
        .ok_or_else(|| format!("configuration '{}' extends unknown configuration '{name}'", stack.last().map(String::as_str).unwrap_or("?")))?;

    stack.push(name.to_string());
    let mut hierarchy: IndexSet<String> = IndexSet::new();
    hierarchy.insert(name.to_string());
    for parent in &def.extends {
        for ancestor in flatten(parent, defs, done, stack)? {
            hierarchy.insert(ancestor);
        }
    }
    stack.pop();

    let hierarchy: Vec<String> = hierarchy.into_iter().collect();
    done.insert(name.to_string(), hierarchy.clone());
    Ok(hierarchy)
}
