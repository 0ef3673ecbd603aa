//! Audio generation backends for the narration loader.

mod config;
mod elevenlabs;
mod error;
mod silence;

pub use config::SpeechClientConfig;
pub use elevenlabs::ElevenLabsClient;
pub use error::SpeechClientError;
pub use silence::SilenceClient;

use std::sync::Arc;

use narration_core::AudioGenerationClient;
use tracing::{info, warn};

/// Build the configured backend. Without an API key this falls back to the
/// local silence generator so the rest of the flow stays usable in development.
pub fn client_from_config(config: &SpeechClientConfig) -> anyhow::Result<Arc<dyn AudioGenerationClient>> {
    if config.api_key.is_none() {
        warn!("TTS_API_KEY not set, narration will be generated as silence (development mode)");
        return Ok(Arc::new(SilenceClient::default()));
    }

    info!(base_url = %config.base_url, model_id = %config.model_id, "Using remote TTS service");
    Ok(Arc::new(ElevenLabsClient::new(config.clone())?))
}
