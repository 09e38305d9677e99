//! Collaborators the engine calls out to: selector → component id and
//! component id → metadata, plus the failure type they report.

use graft_core::identifier::{ComponentIdentifier, ModuleVersionIdentifier, ModuleVersionSelector};
use graft_core::metadata::{ComponentResolveMetadata, ConfigurationNotFound, DependencyMetadata};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// A recoverable failure attached to a selector, component or edge.
///
/// These never abort a resolution; they surface as unresolved dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleVersionResolveError {
    #[error("could not find any version of {selector} in the repository")]
    NotFound { selector: ModuleVersionSelector },

    #[error("could not find {component}")]
    MissingComponent { component: ComponentIdentifier },

    #[error("could not resolve {target}: {message}")]
    Failed { target: String, message: String },

    #[error(transparent)]
    ConfigurationNotFound(#[from] ConfigurationNotFound),

    #[error("resolution of {target} was interrupted")]
    Interrupted { target: String },
}

/// Why a component version was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionReason {
    Root,
    Requested,
    Forced,
    ConflictResolution,
}

impl SelectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Requested => "requested",
            Self::Forced => "forced",
            Self::ConflictResolution => "conflict resolution",
        }
    }
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of turning a dependency's selector into a component id.
#[derive(Debug, Clone)]
pub enum ComponentIdResolveResult {
    Resolved {
        id: ComponentIdentifier,
        module_version: ModuleVersionIdentifier,
        /// Metadata the resolver happened to load on the way, if any.
        metadata: Option<Arc<ComponentResolveMetadata>>,
    },
    Failed(ModuleVersionResolveError),
}

/// Maps a requested selector to a concrete component.
pub trait DependencyToComponentIdResolver {
    fn resolve(&self, dependency: &DependencyMetadata) -> ComponentIdResolveResult;
}

/// Loads the metadata of a component.
///
/// Implementations are shared across threads by the parallel prefetch.
pub trait ComponentMetaDataResolver: Send + Sync {
    fn resolve(
        &self,
        id: &ComponentIdentifier,
    ) -> Result<Arc<ComponentResolveMetadata>, ModuleVersionResolveError>;

    /// Whether `resolve(id)` is known to return without blocking.
    fn is_fetching_metadata_cheap(&self, _id: &ComponentIdentifier) -> bool {
        true
    }
}

impl<T: ComponentMetaDataResolver + ?Sized> ComponentMetaDataResolver for Arc<T> {
    fn resolve(
        &self,
        id: &ComponentIdentifier,
    ) -> Result<Arc<ComponentResolveMetadata>, ModuleVersionResolveError> {
        (**self).resolve(id)
    }

    fn is_fetching_metadata_cheap(&self, id: &ComponentIdentifier) -> bool {
        (**self).is_fetching_metadata_cheap(id)
    }
}

/// Cooperative cancellation checked before every blocking resolver call.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self, target: impl fmt::Display) -> Result<(), ModuleVersionResolveError> {
        if self.is_cancelled() {
            Err(ModuleVersionResolveError::Interrupted {
                target: target.to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(token.check("org.a:a:1.0").is_ok());
        clone.cancel();
        let err = token.check("org.a:a:1.0").unwrap_err();
        assert_eq!(err.to_string(), "resolution of org.a:a:1.0 was interrupted");
    }

    #[test]
    fn error_messages() {
        let err = ModuleVersionResolveError::NotFound {
            selector: ModuleVersionSelector::new("org.d", "d", "1.0"),
        };
        assert_eq!(err.to_string(), "could not find any version of org.d:d:1.0 in the repository");

        let err: ModuleVersionResolveError = ConfigurationNotFound {
            component: ComponentIdentifier::module("org.d", "d", "1.0"),
            configuration: "runtime".into(),
        }
        .into();
        assert_eq!(err.to_string(), "org.d:d:1.0 has no configuration named 'runtime'");
    }

    #[test]
    fn reason_display() {
        assert_eq!(SelectionReason::ConflictResolution.to_string(), "conflict resolution");
        assert_eq!(SelectionReason::Forced.to_string(), "forced");
    }
}
