use async_trait::async_trait;
use narration_core::{AudioGenerationClient, GeneratedAudio};
use reqwest::{header, Client};
use serde::Serialize;
use tracing::debug;

use crate::config::SpeechClientConfig;
use crate::error::SpeechClientError;

/// Longest error body kept in a [`SpeechClientError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Request body for the text-to-speech endpoint
#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        // High similarity: narration is spoken in the user's own cloned voice.
        Self {
            stability: 0.5,
            similarity_boost: 0.85,
        }
    }
}

/// ElevenLabs-compatible text-to-speech client.
pub struct ElevenLabsClient {
    api_key: String,
    client: Client,
    config: SpeechClientConfig,
}

impl ElevenLabsClient {
    pub fn new(config: SpeechClientConfig) -> Result<Self, SpeechClientError> {
        let api_key = config.api_key.clone().ok_or(SpeechClientError::MissingApiKey)?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            api_key,
            client,
            config,
        })
    }

    fn endpoint(&self, voice_id: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{}?output_format={}",
            self.config.base_url, voice_id, self.config.output_format
        )
    }

    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<GeneratedAudio, SpeechClientError> {
        let body = SpeechRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings::default(),
        };

        let response = self
            .client
            .post(self.endpoint(voice_id))
            .header("xi-api-key", &self.api_key)
            .header(header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechClientError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let mime_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| "audio/mpeg".to_string());
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(SpeechClientError::EmptyBody);
        }

        debug!(voice_id, bytes = bytes.len(), mime_type = %mime_type, "TTS response received");
        Ok(GeneratedAudio::new(bytes, mime_type))
    }
}

#[async_trait]
impl AudioGenerationClient for ElevenLabsClient {
    async fn generate(&self, text: &str, voice_id: &str) -> anyhow::Result<GeneratedAudio> {
        Ok(self.synthesize(text, voice_id).await?)
    }
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
