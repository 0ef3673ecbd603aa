//! Common utilities for narration integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use narration_core::{AudioGenerationClient, AudioOutput, AudioHandle, GeneratedAudio, NarrationLoader, NarrationServices};
use tokio::sync::Notify;

/// Fake TTS backend: counts calls, sleeps for a fixed latency and fails on demand.
#[derive(Default)]
pub struct ScriptedClient {
    calls: AtomicUsize,
    failures_left: AtomicUsize,
    latency: Duration,
    requests: Mutex<Vec<(String, String)>>,
}

impl ScriptedClient {
    pub fn new(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            ..Self::default()
        })
    }

    /// Make the next `n` calls fail.
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioGenerationClient for ScriptedClient {
    async fn generate(&self, text: &str, voice_id: &str) -> anyhow::Result<GeneratedAudio> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((text.to_string(), voice_id.to_string()));

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            anyhow::bail!("tts service unavailable");
        }

        Ok(GeneratedAudio::new(
            format!("{voice_id}:{text}").into_bytes(),
            "audio/mpeg",
        ))
    }
}

/// Fresh services plus a loader over the given client.
pub fn loader_with(client: Arc<ScriptedClient>) -> NarrationLoader {
    NarrationLoader::new(NarrationServices::new(), client)
}

/// Audio output that records what it played. With `hold`, playback only
/// finishes once `finish` is notified.
#[derive(Default)]
pub struct FakeOutput {
    pub played: Mutex<Vec<String>>,
    pub stops: AtomicUsize,
    pub finish: Notify,
    pub hold: bool,
    pub fail: bool,
}

impl FakeOutput {
    pub fn instant() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn holding() -> Arc<Self> {
        Arc::new(Self {
            hold: true,
            ..Self::default()
        })
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioOutput for FakeOutput {
    async fn play(&self, handle: AudioHandle) -> anyhow::Result<()> {
        self.played.lock().unwrap().push(handle.id().to_string());
        if self.fail {
            anyhow::bail!("audio device disappeared");
        }
        if self.hold {
            self.finish.notified().await;
        }
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
