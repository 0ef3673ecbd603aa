use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::client::AudioGenerationClient;
use crate::error::NarrationError;
use crate::handle::AudioHandle;
use crate::key::{normalize_text, CacheKey};
use crate::registry::PendingLoad;
use crate::services::{LoaderCounters, LoaderStats, NarrationServices};

/// Resolves narration audio, generating it at most once per `(text, voice)`.
///
/// Cheap to clone; clones share the same services and client.
#[derive(Clone)]
pub struct NarrationLoader {
    services: Arc<NarrationServices>,
    client: Arc<dyn AudioGenerationClient>,
}

enum Admission {
    Cached(AudioHandle),
    Joined(PendingLoad),
    Initiated(PendingLoad),
}

impl NarrationLoader {
    pub fn new(services: Arc<NarrationServices>, client: Arc<dyn AudioGenerationClient>) -> Self {
        Self { services, client }
    }

    /// Loader over the process-wide services.
    pub fn with_global_services(client: Arc<dyn AudioGenerationClient>) -> Self {
        Self::new(NarrationServices::global(), client)
    }

    pub fn services(&self) -> &Arc<NarrationServices> {
        &self.services
    }

    /// Return a playable handle for `text` spoken by `voice_id`.
    ///
    /// Served from the cache when possible, otherwise joins a generation that
    /// is already running for the same pair, otherwise starts one. A started
    /// generation runs to completion even if every caller stops waiting.
    pub async fn load(&self, text: &str, voice_id: &str) -> Result<AudioHandle, NarrationError> {
        let key = self.validated_key(text, voice_id)?;

        let pending = match self.admit(&key, text, voice_id)? {
            Admission::Cached(handle) => return Ok(handle),
            Admission::Joined(pending) => pending,
            Admission::Initiated(pending) => pending,
        };

        pending.await
    }

    /// Whether the narration is already cached.
    pub fn is_cached(&self, text: &str, voice_id: &str) -> bool {
        self.services.cache().has(&CacheKey::new(text, voice_id))
    }

    /// Whether a generation for the narration is running right now.
    pub fn is_pending(&self, text: &str, voice_id: &str) -> bool {
        self.services.registry().has(&CacheKey::new(text, voice_id))
    }

    /// Cached handle, if any, without generating.
    pub fn peek(&self, text: &str, voice_id: &str) -> Option<AudioHandle> {
        self.services.cache().get(&CacheKey::new(text, voice_id))
    }

    /// Cached handle by content id, as found in [`AudioHandle::url`].
    pub fn lookup_by_id(&self, id: &str) -> Option<AudioHandle> {
        self.services.cache().get_by_id(id)
    }

    /// Release every cached handle. Meant for session teardown; generations
    /// still in flight will repopulate their own entries when they finish.
    pub fn release_all(&self) -> usize {
        let released = self.services.cache().clear();
        info!(released, "Released cached narration audio");
        released
    }

    pub fn stats(&self) -> LoaderStats {
        self.services.stats()
    }

    fn validated_key(&self, text: &str, voice_id: &str) -> Result<CacheKey, NarrationError> {
        let problem = if normalize_text(text).is_empty() {
            Some("text is empty")
        } else if voice_id.trim().is_empty() {
            Some("voice id is empty")
        } else {
            None
        };

        match problem {
            Some(reason) => {
                LoaderCounters::bump(&self.services.counters.invalid_requests);
                Err(NarrationError::InvalidRequest(reason))
            }
            None => Ok(CacheKey::new(text, voice_id)),
        }
    }

    /// Check cache, then registry, else register a new generation. Runs under
    /// the admission lock and never suspends, so two callers can never both
    /// see "not cached, not pending" for the same key.
    fn admit(&self, key: &CacheKey, text: &str, voice_id: &str) -> Result<Admission, NarrationError> {
        let _admission = self.services.admit();
        let counters = &self.services.counters;

        if let Some(handle) = self.services.cache().get(key) {
            LoaderCounters::bump(&counters.cache_hits);
            debug!(key = %key, "Narration cache hit");
            return Ok(Admission::Cached(handle));
        }

        if let Some(pending) = self.services.registry().get(key) {
            LoaderCounters::bump(&counters.joins);
            debug!(key = %key, "Joining in-flight narration generation");
            return Ok(Admission::Joined(pending));
        }

        // Checked before registering: an entry without a task behind it would
        // never resolve.
        let runtime = Handle::try_current().map_err(|_| {
            warn!(key = %key, "Narration load polled outside a tokio runtime");
            NarrationError::GenerationFailed("no tokio runtime to run the generation on".to_string())
        })?;

        LoaderCounters::bump(&counters.generations_started);
        let (tx, rx) = oneshot::channel();
        let pending: PendingLoad = async move {
            rx.await.unwrap_or_else(|_| {
                Err(NarrationError::GenerationFailed(
                    "generation task ended without a result".to_string(),
                ))
            })
        }
        .boxed()
        .shared();

        // Registered before the task exists, so its cleanup can never run first.
        self.services.registry().set(key.clone(), pending.clone());

        let services = Arc::clone(&self.services);
        let client = Arc::clone(&self.client);
        let key = key.clone();
        let text = normalize_text(text).to_string();
        let voice_id = voice_id.trim().to_string();
        runtime.spawn(async move {
            let result = {
                let _in_flight = InFlightGuard {
                    services: &services,
                    key: &key,
                };
                generate_and_store(&services, client.as_ref(), &key, &text, &voice_id).await
            };
            // Nobody listening is fine: the cache is already populated.
            let _ = tx.send(result);
        });

        Ok(Admission::Initiated(pending))
    }
}

/// Removes the registry entry when the generation finishes, fails or panics.
struct InFlightGuard<'a> {
    services: &'a NarrationServices,
    key: &'a CacheKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.services.registry().delete(self.key);
    }
}

async fn generate_and_store(
    services: &NarrationServices,
    client: &dyn AudioGenerationClient,
    key: &CacheKey,
    text: &str,
    voice_id: &str,
) -> Result<AudioHandle, NarrationError> {
    let started = std::time::Instant::now();
    info!(key = %key, voice_id, chars = text.chars().count(), "Generating narration");

    let outcome = match client.generate(text, voice_id).await {
        Ok(audio) => AudioHandle::decode(key, audio),
        Err(e) => Err(NarrationError::generation(&e)),
    };

    match outcome {
        Ok(handle) => {
            services.cache().put(key.clone(), handle.clone());
            info!(
                key = %key,
                bytes = handle.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Narration generated"
            );
            Ok(handle)
        }
        Err(e) => {
            LoaderCounters::bump(&services.counters.generations_failed);
            warn!(key = %key, error = %e, "Narration generation failed");
            Err(e)
        }
    }
}
