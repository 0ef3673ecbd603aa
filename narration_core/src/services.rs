use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use serde::Serialize;

use crate::cache::NarrationCache;
use crate::registry::InFlightRequestRegistry;

static GLOBAL: OnceLock<Arc<NarrationServices>> = OnceLock::new();

/// The shared state behind every [`crate::NarrationLoader`].
///
/// One instance per process in production ([`NarrationServices::global`]);
/// tests build a fresh one each.
#[derive(Debug, Default)]
pub struct NarrationServices {
    cache: NarrationCache,
    registry: InFlightRequestRegistry,
    // Serializes "check cache, check registry, else register" across loaders.
    admission: Mutex<()>,
    pub(crate) counters: LoaderCounters,
}

impl NarrationServices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Process-wide instance, created on first use.
    pub fn global() -> Arc<Self> {
        GLOBAL.get_or_init(Self::new).clone()
    }

    pub fn cache(&self) -> &NarrationCache {
        &self.cache
    }

    pub fn registry(&self) -> &InFlightRequestRegistry {
        &self.registry
    }

    pub fn stats(&self) -> LoaderStats {
        LoaderStats {
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            joins: self.counters.joins.load(Ordering::Relaxed),
            generations_started: self.counters.generations_started.load(Ordering::Relaxed),
            generations_failed: self.counters.generations_failed.load(Ordering::Relaxed),
            invalid_requests: self.counters.invalid_requests.load(Ordering::Relaxed),
            cached_entries: self.cache.len(),
            cached_bytes: self.cache.total_bytes(),
            in_flight: self.registry.len(),
        }
    }

    pub(crate) fn admit(&self) -> MutexGuard<'_, ()> {
        self.admission.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Default)]
pub(crate) struct LoaderCounters {
    pub(crate) cache_hits: AtomicU64,
    pub(crate) joins: AtomicU64,
    pub(crate) generations_started: AtomicU64,
    pub(crate) generations_failed: AtomicU64,
    pub(crate) invalid_requests: AtomicU64,
}

impl LoaderCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time loader counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoaderStats {
    pub cache_hits: u64,
    pub joins: u64,
    pub generations_started: u64,
    pub generations_failed: u64,
    pub invalid_requests: u64,
    pub cached_entries: usize,
    pub cached_bytes: usize,
    pub in_flight: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_is_a_singleton() {
        assert!(Arc::ptr_eq(&NarrationServices::global(), &NarrationServices::global()));
    }

    #[test]
    fn test_fresh_instances_are_independent() {
        let a = NarrationServices::new();
        let b = NarrationServices::new();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.stats(), LoaderStats::default());
    }
}
