use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::loader::NarrationLoader;

const SCHEDULED: u8 = 0;
const CANCELLED: u8 = 1;
const FIRED: u8 = 2;

/// Narration attached to one step of a walkthrough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationStep {
    pub id: String,
    pub text: String,
    pub voice_id: String,
}

/// How a scheduled preload ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PreloadOutcome {
    /// Still waiting for its delay, or loading.
    Pending,
    /// Cancelled before the delay elapsed.
    Cancelled,
    /// Already cached or in flight when the delay elapsed.
    Skipped,
    Loaded,
    /// Load failed; swallowed, kept here for diagnostics.
    Failed(String),
}

/// Handle to a scheduled preload.
///
/// Dropping the token does not cancel the preload.
#[derive(Debug, Clone)]
pub struct PreloadToken {
    id: Uuid,
    phase: Arc<AtomicU8>,
    cancel: CancellationToken,
    outcome: watch::Receiver<PreloadOutcome>,
}

impl PreloadToken {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Prevent the load from being issued. Returns `true` only for the call
    /// that actually cancelled it: `false` when the delay had already elapsed
    /// or the preload was cancelled before. An issued load always runs to
    /// completion.
    pub fn cancel(&self) -> bool {
        let won = self
            .phase
            .compare_exchange(SCHEDULED, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.cancel.cancel();
        }
        won
    }

    pub fn is_cancelled(&self) -> bool {
        self.phase.load(Ordering::Acquire) == CANCELLED
    }

    /// Whether the delay elapsed and the preload went ahead.
    pub fn is_fired(&self) -> bool {
        self.phase.load(Ordering::Acquire) == FIRED
    }

    /// Current outcome without waiting.
    pub fn current_outcome(&self) -> PreloadOutcome {
        self.outcome.borrow().clone()
    }

    /// Wait until the preload is settled.
    pub async fn outcome(&self) -> PreloadOutcome {
        let mut rx = self.outcome.clone();
        let settled = match rx.wait_for(|o| *o != PreloadOutcome::Pending).await {
            Ok(outcome) => outcome.clone(),
            // Sender gone without settling: the task was torn down with the runtime.
            Err(_) => PreloadOutcome::Cancelled,
        };
        settled
    }
}

/// Issues delayed, best-effort loads for the step after the current one.
///
/// Holds at most one scheduled target: scheduling again cancels the previous
/// preload if its delay has not elapsed yet.
pub struct PreloadScheduler {
    loader: NarrationLoader,
    current: Mutex<Option<PreloadToken>>,
}

impl PreloadScheduler {
    pub fn new(loader: NarrationLoader) -> Self {
        Self {
            loader,
            current: Mutex::new(None),
        }
    }

    /// After `delay`, load the narration unless it is cached or in flight by
    /// then. Failures are logged and otherwise ignored.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule_preload(&self, text: &str, voice_id: &str, delay: Duration) -> PreloadToken {
        let (outcome_tx, outcome_rx) = watch::channel(PreloadOutcome::Pending);
        let token = PreloadToken {
            id: Uuid::new_v4(),
            phase: Arc::new(AtomicU8::new(SCHEDULED)),
            cancel: CancellationToken::new(),
            outcome: outcome_rx,
        };

        if let Some(previous) = self.lock().replace(token.clone()) {
            if previous.cancel() {
                debug!(token = %previous.id, "Superseded pending preload");
            }
        }

        let loader = self.loader.clone();
        let phase = Arc::clone(&token.phase);
        let cancel = token.cancel.clone();
        let id = token.id;
        let text = text.to_string();
        let voice_id = voice_id.to_string();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = outcome_tx.send(PreloadOutcome::Cancelled);
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            if phase
                .compare_exchange(SCHEDULED, FIRED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                let _ = outcome_tx.send(PreloadOutcome::Cancelled);
                return;
            }

            if loader.is_cached(&text, &voice_id) || loader.is_pending(&text, &voice_id) {
                debug!(token = %id, "Preload skipped, narration already cached or in flight");
                let _ = outcome_tx.send(PreloadOutcome::Skipped);
                return;
            }

            let outcome = match loader.load(&text, &voice_id).await {
                Ok(handle) => {
                    debug!(token = %id, audio_id = handle.id(), "Preloaded narration");
                    PreloadOutcome::Loaded
                }
                Err(e) => {
                    warn!(token = %id, error = %e, "Narration preload failed");
                    PreloadOutcome::Failed(e.to_string())
                }
            };
            let _ = outcome_tx.send(outcome);
        });

        token
    }

    /// Preload the narration of the step that follows the current one.
    /// With no next step, any pending preload is cancelled instead.
    pub fn preload_next_step(&self, next: Option<&NarrationStep>, delay: Duration) -> Option<PreloadToken> {
        match next {
            Some(step) => {
                debug!(step = %step.id, delay_ms = delay.as_millis() as u64, "Scheduling next-step preload");
                Some(self.schedule_preload(&step.text, &step.voice_id, delay))
            }
            None => {
                self.cancel_pending();
                None
            }
        }
    }

    /// The most recently scheduled preload, if any.
    pub fn current(&self) -> Option<PreloadToken> {
        self.lock().clone()
    }

    /// Cancel the scheduled preload, e.g. on page teardown. Returns whether a
    /// load was actually prevented.
    pub fn cancel_pending(&self) -> bool {
        self.lock().take().is_some_and(|token| token.cancel())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<PreloadToken>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PreloadScheduler {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
