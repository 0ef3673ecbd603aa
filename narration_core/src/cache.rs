use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::handle::AudioHandle;
use crate::key::CacheKey;

/// Process-wide `CacheKey -> AudioHandle` store.
///
/// Pure storage: no eviction, no expiry. Entries live until
/// [`crate::NarrationLoader::release_all`] clears them at session teardown.
/// Writes are crate-private so that the loader stays the only writer.
#[derive(Debug, Default)]
pub struct NarrationCache {
    entries: RwLock<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    by_key: HashMap<CacheKey, AudioHandle>,
    // content id -> key, for serving handles by URL
    by_id: HashMap<String, CacheKey>,
}

impl NarrationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<AudioHandle> {
        self.read(|e| e.by_key.get(key).cloned())
    }

    pub fn has(&self, key: &CacheKey) -> bool {
        self.read(|e| e.by_key.contains_key(key))
    }

    /// Look a handle up by its content id (the last URL segment).
    pub fn get_by_id(&self, id: &str) -> Option<AudioHandle> {
        self.read(|e| e.by_id.get(id).and_then(|key| e.by_key.get(key)).cloned())
    }

    pub fn len(&self) -> usize {
        self.read(|e| e.by_key.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of cached audio payload sizes.
    pub fn total_bytes(&self) -> usize {
        self.read(|e| e.by_key.values().map(AudioHandle::len).sum())
    }

    /// Last write wins.
    pub(crate) fn put(&self, key: CacheKey, handle: AudioHandle) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.by_id.insert(key.content_id().to_string(), key.clone());
        entries.by_key.insert(key, handle);
    }

    /// Drop every entry, returning how many were released.
    pub(crate) fn clear(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let released = entries.by_key.len();
        entries.by_key.clear();
        entries.by_id.clear();
        released
    }

    // A poisoned lock only means a writer panicked between two map inserts;
    // the maps themselves are still usable.
    fn read<T>(&self, f: impl FnOnce(&Entries) -> T) -> T {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f(&entries)
    }
}
