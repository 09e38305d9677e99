//! Version conflict detection, resolution strategies and reporting.
//!
//! The engine registers every module that gains a version with a
//! [`ConflictHandler`]. Conflicts are queued rather than resolved on the
//! spot; the engine asks for them one at a time once its work queue drains,
//! so as many versions as possible are known when a winner is picked.

use graft_core::identifier::{ModuleIdentifier, ModuleVersionIdentifier};
use graft_util::errors::GraftError;
use indexmap::IndexSet;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;

use crate::graph::ComponentRef;
use crate::resolvers::SelectionReason;
use crate::version::Version;

/// A report of all version conflicts resolved during a resolution.
#[derive(Debug, Default, Clone)]
pub struct ConflictReport {
    pub conflicts: Vec<VersionConflict>,
}

/// One resolved conflict: the versions that competed and the winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConflict {
    /// The module the winner belongs to.
    pub module: ModuleIdentifier,
    /// Every participating module version, in the order first seen.
    pub requested: Vec<ModuleVersionIdentifier>,
    pub resolved: ModuleVersionIdentifier,
    pub reason: SelectionReason,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: VersionConflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let requested: Vec<String> = self.requested.iter().map(|v| v.to_string()).collect();
        write!(
            f,
            "{}: {} -> {} ({})",
            self.module,
            requested.join(", "),
            self.resolved.version,
            self.reason
        )
    }
}

/// A module that just gained a version, with every version seen so far.
#[derive(Debug, Clone)]
pub struct CandidateModule {
    pub id: ModuleIdentifier,
    pub versions: Vec<ModuleVersionIdentifier>,
}

/// Result of registering a module: the modules now waiting on a shared conflict.
#[derive(Debug, Clone, Default)]
pub struct PotentialConflict {
    participants: Vec<ModuleIdentifier>,
}

impl PotentialConflict {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn conflict_exists(&self) -> bool {
        !self.participants.is_empty()
    }

    pub fn participants(&self) -> &[ModuleIdentifier] {
        &self.participants
    }
}

/// A version competing in a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub component: ComponentRef,
    pub id: ModuleVersionIdentifier,
    /// Targeted by a forced direct dependency of the root.
    pub forced: bool,
}

/// Supplies the current candidates of a module when a conflict is resolved.
pub trait CandidateSource {
    fn candidates(&self, module: &ModuleIdentifier) -> Vec<Candidate>;
}

/// A version picked by a [`ModuleConflictResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub component: ComponentRef,
    pub reason: SelectionReason,
}

/// Picks a winner among competing versions.
///
/// Returning `Ok(None)` defers to the next resolver.
pub trait ModuleConflictResolver {
    fn select(&self, candidates: &[Candidate]) -> Result<Option<Selection>, GraftError>;
}

/// Picks the highest version.
#[derive(Debug, Default, Clone, Copy)]
pub struct LatestModuleConflictResolver;

impl ModuleConflictResolver for LatestModuleConflictResolver {
    fn select(&self, candidates: &[Candidate]) -> Result<Option<Selection>, GraftError> {
        let mut best: Option<(&Candidate, Version)> = None;
        for candidate in candidates {
            let version = Version::parse(&candidate.id.version);
            if best.as_ref().map_or(true, |(_, v)| version > *v) {
                best = Some((candidate, version));
            }
        }
        Ok(best.map(|(c, _)| Selection {
            component: c.component,
            reason: SelectionReason::ConflictResolution,
        }))
    }
}

/// Refuses to pick: any conflict aborts the resolution.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictConflictResolver;

impl ModuleConflictResolver for StrictConflictResolver {
    fn select(&self, candidates: &[Candidate]) -> Result<Option<Selection>, GraftError> {
        let versions: Vec<String> = candidates.iter().map(|c| c.id.to_string()).collect();
        Err(GraftError::Resolution {
            message: format!("version conflict between {}", versions.join(" and ")),
        })
    }
}

/// Picks the candidate targeted by a forced direct dependency of the root.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectDependencyForcingResolver;

impl ModuleConflictResolver for DirectDependencyForcingResolver {
    fn select(&self, candidates: &[Candidate]) -> Result<Option<Selection>, GraftError> {
        Ok(candidates.iter().find(|c| c.forced).map(|c| Selection {
            component: c.component,
            reason: SelectionReason::Forced,
        }))
    }
}

/// The outcome of one conflict: the winner, applied to every participant.
#[derive(Debug, Clone)]
pub struct ConflictResolutionResult {
    pub participants: Vec<ModuleIdentifier>,
    /// Every version of every participant.
    pub requested: Vec<ModuleVersionIdentifier>,
    /// The versions the winner was picked from.
    pub candidates: Vec<Candidate>,
    pub selected: ComponentRef,
    pub reason: SelectionReason,
}

/// Detects conflicts as modules are registered and resolves them on demand.
pub trait ConflictHandler {
    fn register_module(&mut self, module: CandidateModule) -> PotentialConflict;

    fn has_conflicts(&self) -> bool;

    /// Resolve the oldest pending conflict, if any.
    fn resolve_next_conflict(
        &mut self,
        source: &dyn CandidateSource,
    ) -> Result<Option<ConflictResolutionResult>, GraftError>;

    /// Add a resolver consulted before the default strategy.
    fn register_resolver(&mut self, resolver: Box<dyn ModuleConflictResolver>);
}

#[derive(Debug)]
struct PendingConflict {
    participants: IndexSet<ModuleIdentifier>,
    // When set, only this module's versions compete.
    candidates_from: Option<ModuleIdentifier>,
}

/// Queue-based [`ConflictHandler`] with module replacement support.
pub struct DefaultConflictHandler {
    resolvers: Vec<Box<dyn ModuleConflictResolver>>,
    default_resolver: Box<dyn ModuleConflictResolver>,
    replacements: BTreeMap<ModuleIdentifier, ModuleIdentifier>,
    seen: HashSet<ModuleIdentifier>,
    pending: VecDeque<PendingConflict>,
}

impl DefaultConflictHandler {
    pub fn new(default_resolver: Box<dyn ModuleConflictResolver>) -> Self {
        Self {
            resolvers: Vec::new(),
            default_resolver,
            replacements: BTreeMap::new(),
            seen: HashSet::new(),
            pending: VecDeque::new(),
        }
    }

    /// Highest version wins.
    pub fn latest() -> Self {
        Self::new(Box::new(LatestModuleConflictResolver))
    }

    /// Declare that `replaced` is superseded by `replacement`.
    pub fn with_replacements(mut self, replacements: BTreeMap<ModuleIdentifier, ModuleIdentifier>) -> Self {
        self.replacements = replacements;
        self
    }

    fn register_conflict(
        &mut self,
        participants: impl IntoIterator<Item = ModuleIdentifier>,
        candidates_from: Option<ModuleIdentifier>,
    ) -> PotentialConflict {
        let mut merged = PendingConflict {
            participants: participants.into_iter().collect(),
            candidates_from,
        };
        let mut position = None;
        let mut i = 0;
        while i < self.pending.len() {
            let overlaps = self.pending[i]
                .participants
                .iter()
                .any(|p| merged.participants.contains(p));
            if !overlaps {
                i += 1;
                continue;
            }
            if let Some(existing) = self.pending.remove(i) {
                position.get_or_insert(i);
                for p in existing.participants {
                    merged.participants.insert(p);
                }
                if merged.candidates_from.is_none() {
                    merged.candidates_from = existing.candidates_from;
                }
            }
        }
        let result = PotentialConflict {
            participants: merged.participants.iter().cloned().collect(),
        };
        match position {
            Some(at) => self.pending.insert(at, merged),
            None => self.pending.push_back(merged),
        }
        result
    }
}

impl ConflictHandler for DefaultConflictHandler {
    fn register_module(&mut self, module: CandidateModule) -> PotentialConflict {
        self.seen.insert(module.id.clone());

        if let Some(replacement) = self.replacements.get(&module.id).cloned() {
            if self.seen.contains(&replacement) {
                tracing::debug!("{} is replaced by {}", module.id, replacement);
                return self.register_conflict([module.id, replacement.clone()], Some(replacement));
            }
        }
        let replaced: Vec<ModuleIdentifier> = self
            .replacements
            .iter()
            .filter(|(from, to)| **to == module.id && self.seen.contains(*from))
            .map(|(from, _)| from.clone())
            .collect();
        if !replaced.is_empty() {
            tracing::debug!("{} replaces {:?}", module.id, replaced);
            let participants = replaced.into_iter().chain([module.id.clone()]);
            return self.register_conflict(participants, Some(module.id));
        }

        let in_pending = self
            .pending
            .iter()
            .any(|c| c.participants.contains(&module.id));
        if module.versions.len() > 1 || in_pending {
            return self.register_conflict([module.id], None);
        }
        PotentialConflict::none()
    }

    fn has_conflicts(&self) -> bool {
        !self.pending.is_empty()
    }

    fn resolve_next_conflict(
        &mut self,
        source: &dyn CandidateSource,
    ) -> Result<Option<ConflictResolutionResult>, GraftError> {
        let Some(conflict) = self.pending.pop_front() else {
            return Ok(None);
        };
        let all: Vec<Candidate> = conflict
            .participants
            .iter()
            .flat_map(|m| source.candidates(m))
            .collect();
        let requested: Vec<ModuleVersionIdentifier> = all.iter().map(|c| c.id.clone()).collect();
        let candidates: Vec<Candidate> = match &conflict.candidates_from {
            Some(module) => all.into_iter().filter(|c| c.id.module == *module).collect(),
            None => all,
        };
        let participants: Vec<ModuleIdentifier> = conflict.participants.into_iter().collect();
        if candidates.is_empty() {
            return Err(GraftError::illegal_state(format!(
                "conflict between {participants:?} has no candidates"
            )));
        }

        let mut selection = None;
        for resolver in self.resolvers.iter().chain(std::iter::once(&self.default_resolver)) {
            if let Some(picked) = resolver.select(&candidates)? {
                selection = Some(picked);
                break;
            }
        }
        let selection = selection.ok_or_else(|| {
            GraftError::illegal_state(format!("no resolver selected a version for {participants:?}"))
        })?;

        Ok(Some(ConflictResolutionResult {
            participants,
            requested,
            candidates,
            selected: selection.component,
            reason: selection.reason,
        }))
    }

    fn register_resolver(&mut self, resolver: Box<dyn ModuleConflictResolver>) {
        self.resolvers.push(resolver);
    }
}
