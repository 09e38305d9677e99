//! Exclusion filters.
//!
//! A [`ModuleExclusion`] decides which modules, and which artifacts of
//! included modules, are filtered out while traversing an edge. Filters are
//! immutable values combined with [`ModuleExclusions::intersect`] (excludes
//! what either excludes) and [`ModuleExclusions::union`] (excludes only what
//! both exclude). Combinations are memoized per resolution.

use globset::{Glob, GlobMatcher};
use graft_core::identifier::ModuleIdentifier;
use graft_core::metadata::{ArtifactPattern, Exclude, IvyArtifactName, PatternMatcher, WILDCARD};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An exclusion filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleExclusion {
    /// Excludes nothing.
    ExcludeNone,
    /// Excludes every module.
    ExcludeAllModules,
    ModuleId(ModuleIdentifier),
    /// Excludes every module with this name, in any group.
    ModuleName(String),
    /// Excludes every module in this group.
    GroupName(String),
    /// Excludes matching artifacts but never whole modules.
    Artifact(ArtifactRule),
    /// A rule using glob patterns; never merged with other rules.
    Pattern(Arc<PatternRule>),
    /// Excludes what any member excludes. Members are sorted and distinct.
    Intersection(Arc<[ModuleExclusion]>),
    /// Excludes only what every member excludes. Members are sorted and distinct.
    Union(Arc<[ModuleExclusion]>),
}

/// Artifact-level exclusion with literal patterns (`*` matches anything).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactRule {
    pub group: String,
    pub module: String,
    pub artifact: ArtifactPattern,
}

impl ArtifactRule {
    fn matches(&self, module: &ModuleIdentifier, artifact: &IvyArtifactName) -> bool {
        literal(&self.group, &module.group)
            && literal(&self.module, &module.name)
            && literal(&self.artifact.name, &artifact.name)
            && literal(&self.artifact.kind, &artifact.kind)
            && literal(&self.artifact.extension, &artifact.extension)
    }
}

fn literal(pattern: &str, value: &str) -> bool {
    pattern == WILDCARD || pattern == value
}

/// A glob rule. Equality, ordering and hashing use the source patterns.
#[derive(Debug)]
pub struct PatternRule {
    source: Exclude,
    group: Pat,
    module: Pat,
    name: Pat,
    kind: Pat,
    extension: Pat,
}

#[derive(Debug)]
enum Pat {
    Any,
    Glob(GlobMatcher),
    // The pattern failed to compile and is compared literally.
    Literal(String),
}

impl Pat {
    fn new(pattern: &str) -> Self {
        if pattern == WILDCARD {
            return Pat::Any;
        }
        match Glob::new(pattern) {
            Ok(glob) => Pat::Glob(glob.compile_matcher()),
            Err(e) => {
                tracing::warn!("invalid exclude pattern '{pattern}': {e}; matching literally");
                Pat::Literal(pattern.to_string())
            }
        }
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Pat::Any => true,
            Pat::Glob(m) => m.is_match(value),
            Pat::Literal(s) => s == value,
        }
    }
}

impl PatternRule {
    fn new(source: Exclude) -> Self {
        Self {
            group: Pat::new(&source.group),
            module: Pat::new(&source.module),
            name: Pat::new(&source.artifact.name),
            kind: Pat::new(&source.artifact.kind),
            extension: Pat::new(&source.artifact.extension),
            source,
        }
    }

    fn module_wide(&self) -> bool {
        self.source.is_module_wide()
    }

    fn matches_module(&self, module: &ModuleIdentifier) -> bool {
        self.group.matches(&module.group) && self.module.matches(&module.name)
    }

    fn matches_artifact(&self, artifact: &IvyArtifactName) -> bool {
        self.name.matches(&artifact.name)
            && self.kind.matches(&artifact.kind)
            && self.extension.matches(&artifact.extension)
    }

    fn key(&self) -> (&str, &str, &ArtifactPattern) {
        (&self.source.group, &self.source.module, &self.source.artifact)
    }
}

impl PartialEq for PatternRule {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for PatternRule {}

impl Hash for PatternRule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for PatternRule {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PatternRule {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl ModuleExclusion {
    /// Whether `module` is filtered out entirely.
    pub fn exclude_module(&self, module: &ModuleIdentifier) -> bool {
        match self {
            Self::ExcludeNone | Self::Artifact(_) => false,
            Self::ExcludeAllModules => true,
            Self::ModuleId(id) => id == module,
            Self::ModuleName(name) => *name == module.name,
            Self::GroupName(group) => *group == module.group,
            Self::Pattern(rule) => rule.module_wide() && rule.matches_module(module),
            Self::Intersection(members) => members.iter().any(|m| m.exclude_module(module)),
            Self::Union(members) => members.iter().all(|m| m.exclude_module(module)),
        }
    }

    /// Whether `artifact` of an included `module` is filtered out.
    pub fn exclude_artifact(&self, module: &ModuleIdentifier, artifact: &IvyArtifactName) -> bool {
        match self {
            Self::Artifact(rule) => rule.matches(module, artifact),
            Self::Pattern(rule) => {
                !rule.module_wide() && rule.matches_module(module) && rule.matches_artifact(artifact)
            }
            Self::Intersection(members) => members.iter().any(|m| m.exclude_artifact(module, artifact)),
            Self::Union(members) => members.iter().all(|m| m.exclude_artifact(module, artifact)),
            _ => false,
        }
    }

    /// Whether this filter could exclude any artifact at all.
    pub fn may_exclude_artifacts(&self) -> bool {
        match self {
            Self::Artifact(_) => true,
            Self::Pattern(rule) => !rule.module_wide(),
            Self::Intersection(members) => members.iter().any(Self::may_exclude_artifacts),
            Self::Union(members) => members.iter().all(Self::may_exclude_artifacts),
            _ => false,
        }
    }

    /// Cheap structural check that both filters exclude exactly the same modules.
    ///
    /// A `false` answer does not prove the filters differ.
    pub fn excludes_same_modules_as(&self, other: &ModuleExclusion) -> bool {
        self == other || self.module_view() == other.module_view()
    }

    // The same filter with every artifact-only rule dropped.
    fn module_view(&self) -> ModuleExclusion {
        match self {
            Self::Artifact(_) => Self::ExcludeNone,
            Self::Pattern(rule) if !rule.module_wide() => Self::ExcludeNone,
            Self::Intersection(members) => {
                let views: Vec<_> = members
                    .iter()
                    .map(Self::module_view)
                    .filter(|v| *v != Self::ExcludeNone)
                    .collect();
                composite(views, Self::Intersection)
            }
            Self::Union(members) => {
                let views: Vec<_> = members.iter().map(Self::module_view).collect();
                if views.iter().any(|v| *v == Self::ExcludeNone) {
                    Self::ExcludeNone
                } else {
                    composite(views, Self::Union)
                }
            }
            other => other.clone(),
        }
    }

    fn members(&self) -> &[ModuleExclusion] {
        match self {
            Self::Intersection(members) | Self::Union(members) => members,
            other => std::slice::from_ref(other),
        }
    }
}

fn composite(
    mut members: Vec<ModuleExclusion>,
    make: fn(Arc<[ModuleExclusion]>) -> ModuleExclusion,
) -> ModuleExclusion {
    members.sort();
    members.dedup();
    match members.len() {
        0 => ModuleExclusion::ExcludeNone,
        1 => members.remove(0),
        _ => make(members.into()),
    }
}

/// Converts a declared rule into a filter.
fn from_exclude(exclude: &Exclude) -> ModuleExclusion {
    if exclude.matcher == PatternMatcher::Glob {
        return ModuleExclusion::Pattern(Arc::new(PatternRule::new(exclude.clone())));
    }
    if !exclude.is_module_wide() {
        return ModuleExclusion::Artifact(ArtifactRule {
            group: exclude.group.clone(),
            module: exclude.module.clone(),
            artifact: exclude.artifact.clone(),
        });
    }
    match (exclude.group.as_str(), exclude.module.as_str()) {
        (WILDCARD, WILDCARD) => ModuleExclusion::ExcludeAllModules,
        (WILDCARD, name) => ModuleExclusion::ModuleName(name.to_string()),
        (group, WILDCARD) => ModuleExclusion::GroupName(group.to_string()),
        (group, name) => ModuleExclusion::ModuleId(ModuleIdentifier::new(group, name)),
    }
}

// What both `a` and `b` exclude, for two rules of the closed exact set.
// `Err` when either rule cannot be merged.
fn merge_pair(a: &ModuleExclusion, b: &ModuleExclusion) -> Result<Option<ModuleExclusion>, ()> {
    use ModuleExclusion as E;
    let merged = match (a, b) {
        (E::Pattern(_), _) | (_, E::Pattern(_)) => return Err(()),
        (E::Intersection(_) | E::Union(_) | E::ExcludeNone, _)
        | (_, E::Intersection(_) | E::Union(_) | E::ExcludeNone) => return Err(()),
        (E::ExcludeAllModules, other) | (other, E::ExcludeAllModules) => Some(other.clone()),
        (E::Artifact(_), _) => Some(a.clone()),
        (_, E::Artifact(_)) => Some(b.clone()),
        (E::GroupName(g1), E::GroupName(g2)) => (g1 == g2).then(|| a.clone()),
        (E::GroupName(g), E::ModuleName(n)) | (E::ModuleName(n), E::GroupName(g)) => {
            Some(E::ModuleId(ModuleIdentifier::new(g, n)))
        }
        (E::GroupName(g), E::ModuleId(id)) | (E::ModuleId(id), E::GroupName(g)) => {
            (id.group == *g).then(|| E::ModuleId(id.clone()))
        }
        (E::ModuleName(n1), E::ModuleName(n2)) => (n1 == n2).then(|| a.clone()),
        (E::ModuleName(n), E::ModuleId(id)) | (E::ModuleId(id), E::ModuleName(n)) => {
            (id.name == *n).then(|| E::ModuleId(id.clone()))
        }
        (E::ModuleId(x), E::ModuleId(y)) => (x == y).then(|| a.clone()),
    };
    Ok(merged)
}

/// Per-resolution factory and cache for exclusion filters.
#[derive(Debug, Default)]
pub struct ModuleExclusions {
    any_cache: RefCell<HashMap<Vec<Exclude>, ModuleExclusion>>,
    intersect_cache: RefCell<HashMap<(ModuleExclusion, ModuleExclusion), ModuleExclusion>>,
    union_cache: RefCell<HashMap<(ModuleExclusion, ModuleExclusion), ModuleExclusion>>,
}

impl ModuleExclusions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude_none(&self) -> ModuleExclusion {
        ModuleExclusion::ExcludeNone
    }

    /// A filter excluding whatever any of `excludes` excludes.
    pub fn exclude_any(&self, excludes: &[Exclude]) -> ModuleExclusion {
        if excludes.is_empty() {
            return ModuleExclusion::ExcludeNone;
        }
        if let Some(hit) = self.any_cache.borrow().get(excludes) {
            return hit.clone();
        }
        let filter = composite(excludes.iter().map(from_exclude).collect(), ModuleExclusion::Intersection);
        self.any_cache
            .borrow_mut()
            .insert(excludes.to_vec(), filter.clone());
        filter
    }

    /// A filter excluding what either `a` or `b` excludes.
    pub fn intersect(&self, a: &ModuleExclusion, b: &ModuleExclusion) -> ModuleExclusion {
        if a == b || *b == ModuleExclusion::ExcludeNone {
            return a.clone();
        }
        if *a == ModuleExclusion::ExcludeNone {
            return b.clone();
        }
        let key = ordered(a, b);
        if let Some(hit) = self.intersect_cache.borrow().get(&key) {
            return hit.clone();
        }
        let members: Vec<ModuleExclusion> = [a, b]
            .into_iter()
            .flat_map(|e| match e {
                ModuleExclusion::Intersection(members) => members.to_vec(),
                other => vec![other.clone()],
            })
            .collect();
        let filter = composite(members, ModuleExclusion::Intersection);
        self.intersect_cache.borrow_mut().insert(key, filter.clone());
        filter
    }

    /// A filter excluding only what both `a` and `b` exclude.
    pub fn union(&self, a: &ModuleExclusion, b: &ModuleExclusion) -> ModuleExclusion {
        if a == b {
            return a.clone();
        }
        if *a == ModuleExclusion::ExcludeNone || *b == ModuleExclusion::ExcludeNone {
            return ModuleExclusion::ExcludeNone;
        }
        let key = ordered(a, b);
        if let Some(hit) = self.union_cache.borrow().get(&key) {
            return hit.clone();
        }
        let filter = match merge_into_intersection(a, b) {
            Some(merged) => merged,
            None => {
                let members: Vec<ModuleExclusion> = [a, b]
                    .into_iter()
                    .flat_map(|e| match e {
                        ModuleExclusion::Union(members) => members.to_vec(),
                        other => vec![other.clone()],
                    })
                    .collect();
                composite(members, ModuleExclusion::Union)
            }
        };
        self.union_cache.borrow_mut().insert(key, filter.clone());
        filter
    }
}

// (∨x) ∧ (∨y) = ∨(x ∧ y), when every pairwise merge is expressible.
fn merge_into_intersection(a: &ModuleExclusion, b: &ModuleExclusion) -> Option<ModuleExclusion> {
    if matches!(a, ModuleExclusion::Union(_)) || matches!(b, ModuleExclusion::Union(_)) {
        return None;
    }
    let mut merged = Vec::new();
    for x in a.members() {
        for y in b.members() {
            if let Some(m) = merge_pair(x, y).ok()? {
                merged.push(m);
            }
        }
    }
    Some(composite(merged, ModuleExclusion::Intersection))
}

fn ordered(a: &ModuleExclusion, b: &ModuleExclusion) -> (ModuleExclusion, ModuleExclusion) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}
