//! Narration pre-fetch cache.
//!
//! Generated narration audio is cached per `(text, voice)` pair for the
//! lifetime of the process. Concurrent requests for the same pair collapse
//! onto a single generation call, and a one-step-ahead preload scheduler
//! warms the cache before the user reaches the next step of a walkthrough.
//!
//! The pieces, leaf first:
//!
//! - [`AudioGenerationClient`]: the external text-to-speech capability.
//! - [`NarrationCache`] and [`InFlightRequestRegistry`]: shared state, owned
//!   by [`NarrationServices`].
//! - [`NarrationLoader`]: the only writer to that shared state.
//! - [`PreloadScheduler`]: delayed, cancellable, best-effort loads.
//! - [`NarrationPlaybackController`]: single-playback consumer on top.

mod cache;
mod client;
mod error;
mod handle;
mod key;
mod loader;
mod playback;
mod registry;
mod scheduler;
mod services;
pub mod wav;

pub use cache::NarrationCache;
pub use client::{AudioGenerationClient, GeneratedAudio};
pub use error::NarrationError;
pub use handle::{AudioHandle, AUDIO_URL_PREFIX};
pub use key::{normalize_text, CacheKey};
pub use loader::NarrationLoader;
pub use playback::{AudioOutput, NarrationPlaybackController, PlaybackEvent, PlaybackState};
pub use registry::{InFlightRequestRegistry, PendingLoad};
pub use scheduler::{NarrationStep, PreloadOutcome, PreloadScheduler, PreloadToken};
pub use services::{LoaderStats, NarrationServices};
