use async_trait::async_trait;
use bytes::Bytes;

/// Encoded audio returned by a generation backend.
#[derive(Debug, Clone)]
pub struct GeneratedAudio {
    pub bytes: Bytes,
    pub mime_type: String,
}

impl GeneratedAudio {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Text-to-speech backend consumed by the loader.
///
/// Implementations own their transport, authentication and timeouts; any
/// failure is reported to the loader as a plain error.
#[async_trait]
pub trait AudioGenerationClient: Send + Sync {
    async fn generate(&self, text: &str, voice_id: &str) -> anyhow::Result<GeneratedAudio>;
}
