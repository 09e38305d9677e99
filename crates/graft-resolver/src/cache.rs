//! Metadata cache shared by resolutions.
//!
//! Each component id maps to a once-cell, so concurrent requests for the same
//! component block on a single fetch instead of issuing their own.

use dashmap::DashMap;
use graft_core::identifier::ComponentIdentifier;
use graft_core::metadata::ComponentResolveMetadata;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::resolvers::{CancellationToken, ComponentMetaDataResolver, ModuleVersionResolveError};

type Slot = Arc<OnceCell<Result<Arc<ComponentResolveMetadata>, ModuleVersionResolveError>>>;

/// Single-flight caching wrapper around a [`ComponentMetaDataResolver`].
#[derive(Debug)]
pub struct CachingMetaDataResolver<R> {
    inner: R,
    slots: DashMap<ComponentIdentifier, Slot>,
    cancellation: CancellationToken,
    fetches: AtomicUsize,
}

impl<R: ComponentMetaDataResolver> CachingMetaDataResolver<R> {
    pub fn new(inner: R) -> Self {
        Self::with_cancellation(inner, CancellationToken::new())
    }

    pub fn with_cancellation(inner: R, cancellation: CancellationToken) -> Self {
        Self {
            inner,
            slots: DashMap::new(),
            cancellation,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of calls that reached the wrapped resolver.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn slot(&self, id: &ComponentIdentifier) -> Slot {
        // Clone the slot out so the shard lock is released before fetching.
        self.slots.entry(id.clone()).or_default().clone()
    }
}

impl<R: ComponentMetaDataResolver> ComponentMetaDataResolver for CachingMetaDataResolver<R> {
    fn resolve(
        &self,
        id: &ComponentIdentifier,
    ) -> Result<Arc<ComponentResolveMetadata>, ModuleVersionResolveError> {
        let slot = self.slot(id);
        if let Some(cached) = slot.get() {
            return cached.clone();
        }
        self.cancellation.check(id)?;
        slot.get_or_init(|| {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tracing::trace!("fetching metadata for {id}");
            self.inner.resolve(id)
        })
        .clone()
    }

    fn is_fetching_metadata_cheap(&self, id: &ComponentIdentifier) -> bool {
        let cached = self
            .slots
            .get(id)
            .map(|slot| slot.get().is_some())
            .unwrap_or(false);
        cached || self.inner.is_fetching_metadata_cheap(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::identifier::ModuleVersionIdentifier;
    use graft_core::metadata::ConfigurationDefinition;
    use std::thread;
    use std::time::Duration;

    struct Slow;

    impl ComponentMetaDataResolver for Slow {
        fn resolve(
            &self,
            id: &ComponentIdentifier,
        ) -> Result<Arc<ComponentResolveMetadata>, ModuleVersionResolveError> {
            thread::sleep(Duration::from_millis(20));
            match id {
                ComponentIdentifier::Module(mv) if mv.version != "0" => Ok(Arc::new(
                    ComponentResolveMetadata::new(
                        mv.clone(),
                        id.clone(),
                        vec![ConfigurationDefinition::new("default")],
                    )
                    .unwrap(),
                )),
                _ => Err(ModuleVersionResolveError::MissingComponent { component: id.clone() }),
            }
        }

        fn is_fetching_metadata_cheap(&self, _id: &ComponentIdentifier) -> bool {
            false
        }
    }

    fn id(version: &str) -> ComponentIdentifier {
        ComponentIdentifier::Module(ModuleVersionIdentifier::new("org.a", "a", version))
    }

    #[test]
    fn concurrent_requests_fetch_once() {
        let cache = Arc::new(CachingMetaDataResolver::new(Slow));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.resolve(&id("1.0")).is_ok())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
        assert_eq!(cache.fetch_count(), 1);
    }

    #[test]
    fn failures_are_cached_too() {
        let cache = CachingMetaDataResolver::new(Slow);
        assert!(cache.resolve(&id("0")).is_err());
        assert!(cache.resolve(&id("0")).is_err());
        assert_eq!(cache.fetch_count(), 1);
    }

    #[test]
    fn cached_entries_are_cheap() {
        let cache = CachingMetaDataResolver::new(Slow);
        assert!(!cache.is_fetching_metadata_cheap(&id("1.0")));
        cache.resolve(&id("1.0")).unwrap();
        assert!(cache.is_fetching_metadata_cheap(&id("1.0")));
    }

    #[test]
    fn cancelled_before_fetch() {
        let token = CancellationToken::new();
        let cache = CachingMetaDataResolver::with_cancellation(Slow, token.clone());
        token.cancel();
        let err = cache.resolve(&id("1.0")).unwrap_err();
        assert!(matches!(err, ModuleVersionResolveError::Interrupted { .. }));
        assert_eq!(cache.fetch_count(), 0);
    }
}
