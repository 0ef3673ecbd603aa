use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use futures::future::{BoxFuture, Shared};

use crate::error::NarrationError;
use crate::handle::AudioHandle;
use crate::key::CacheKey;

/// A generation in progress. Every clone resolves to the same outcome.
pub type PendingLoad = Shared<BoxFuture<'static, Result<AudioHandle, NarrationError>>>;

/// Process-wide `CacheKey -> PendingLoad` map used to collapse concurrent
/// requests for the same narration onto one generation call.
///
/// Holds at most one entry per key. Writes are crate-private.
#[derive(Default)]
pub struct InFlightRequestRegistry {
    pending: Mutex<HashMap<CacheKey, PendingLoad>>,
}

impl InFlightRequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<PendingLoad> {
        self.lock().get(key).cloned()
    }

    pub fn has(&self, key: &CacheKey) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn set(&self, key: CacheKey, load: PendingLoad) {
        self.lock().insert(key, load);
    }

    pub(crate) fn delete(&self, key: &CacheKey) {
        self.lock().remove(key);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, PendingLoad>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for InFlightRequestRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightRequestRegistry")
            .field("pending", &self.len())
            .finish()
    }
}
