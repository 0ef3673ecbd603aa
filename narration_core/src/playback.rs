use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::handle::AudioHandle;
use crate::loader::NarrationLoader;

/// Where decoded narration is actually played.
#[async_trait]
pub trait AudioOutput: Send + Sync + 'static {
    /// Play `handle`, resolving once playback reaches the end.
    async fn play(&self, handle: AudioHandle) -> anyhow::Result<()>;

    /// Halt the current playback, if any.
    fn stop(&self);
}

/// Lifecycle notifications sent to the controller's owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Loading,
    Started { audio_id: String },
    Paused,
    Ended,
    Failed { error: String, retryable: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Failed,
}

struct Inner {
    state: PlaybackState,
    active: Option<JoinHandle<()>>,
    last_request: Option<(String, String)>,
    // Bumped on every play/stop so a superseded task stays silent.
    generation: u64,
}

/// Plays one narration at a time for a single consumer.
///
/// Events arrive on the receiver returned by [`NarrationPlaybackController::new`].
pub struct NarrationPlaybackController<O: AudioOutput> {
    loader: NarrationLoader,
    output: Arc<O>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    inner: Arc<Mutex<Inner>>,
}

impl<O: AudioOutput> NarrationPlaybackController<O> {
    pub fn new(loader: NarrationLoader, output: Arc<O>) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let controller = Self {
            loader,
            output,
            events,
            inner: Arc::new(Mutex::new(Inner {
                state: PlaybackState::Idle,
                active: None,
                last_request: None,
                generation: 0,
            })),
        };
        (controller, rx)
    }

    pub fn state(&self) -> PlaybackState {
        lock(&self.inner).state
    }

    /// Load and play a narration, stopping whatever this controller was playing.
    pub fn play(&self, text: &str, voice_id: &str) {
        let mut inner = lock(&self.inner);
        self.halt(&mut inner);

        inner.generation += 1;
        inner.state = PlaybackState::Loading;
        inner.last_request = Some((text.to_string(), voice_id.to_string()));
        let _ = self.events.send(PlaybackEvent::Loading);

        let generation = inner.generation;
        let loader = self.loader.clone();
        let output = Arc::clone(&self.output);
        let events = self.events.clone();
        let shared = Arc::clone(&self.inner);
        let text = text.to_string();
        let voice_id = voice_id.to_string();

        inner.active = Some(tokio::spawn(async move {
            let handle = match loader.load(&text, &voice_id).await {
                Ok(handle) => handle,
                Err(e) => {
                    transition(&shared, generation, PlaybackState::Failed, &events, || PlaybackEvent::Failed {
                        error: e.to_string(),
                        retryable: e.is_retryable(),
                    });
                    return;
                }
            };

            let audio_id = handle.id().to_string();
            if !transition(&shared, generation, PlaybackState::Playing, &events, || PlaybackEvent::Started {
                audio_id,
            }) {
                return;
            }

            match output.play(handle).await {
                Ok(()) => {
                    transition(&shared, generation, PlaybackState::Idle, &events, || PlaybackEvent::Ended);
                }
                Err(e) => {
                    warn!(error = %e, "Narration playback failed");
                    transition(&shared, generation, PlaybackState::Failed, &events, || PlaybackEvent::Failed {
                        error: format!("playback failed: {e:#}"),
                        retryable: true,
                    });
                }
            }
        }));
    }

    /// Stop playback. A load still pending is abandoned, not cancelled:
    /// other consumers may be waiting on the same generation.
    pub fn stop(&self) {
        let mut inner = lock(&self.inner);
        self.halt(&mut inner);
        inner.generation += 1;
    }

    /// Play the last requested narration again. Returns `false` if nothing
    /// was ever requested.
    pub fn retry(&self) -> bool {
        let last = lock(&self.inner).last_request.clone();
        match last {
            Some((text, voice_id)) => {
                debug!("Retrying narration playback");
                self.play(&text, &voice_id);
                true
            }
            None => false,
        }
    }

    fn halt(&self, inner: &mut Inner) {
        if let Some(task) = inner.active.take() {
            task.abort();
        }
        if inner.state == PlaybackState::Playing {
            self.output.stop();
            let _ = self.events.send(PlaybackEvent::Paused);
        }
        inner.state = PlaybackState::Idle;
    }
}

impl<O: AudioOutput> Drop for NarrationPlaybackController<O> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Apply a state change and emit its event, unless the task was superseded.
fn transition(
    inner: &Mutex<Inner>,
    generation: u64,
    state: PlaybackState,
    events: &mpsc::UnboundedSender<PlaybackEvent>,
    event: impl FnOnce() -> PlaybackEvent,
) -> bool {
    let mut inner = lock(inner);
    if inner.generation != generation {
        return false;
    }
    inner.state = state;
    if state != PlaybackState::Playing {
        inner.active = None;
    }
    let _ = events.send(event());
    true
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
