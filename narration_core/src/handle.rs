use std::sync::Arc;

use base64::Engine;
use bytes::Bytes;

use crate::client::GeneratedAudio;
use crate::error::NarrationError;
use crate::key::CacheKey;
use crate::wav;

/// Path prefix under which cached audio is served locally.
pub const AUDIO_URL_PREFIX: &str = "/narration/audio";

/// A playable, locally resolvable narration resource.
///
/// Clones share the same underlying buffer; [`AudioHandle::ptr_eq`] tells
/// whether two handles came from the same generation.
#[derive(Debug, Clone)]
pub struct AudioHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    id: String,
    mime_type: String,
    bytes: Bytes,
    duration_ms: Option<u64>,
}

impl AudioHandle {
    /// Turn a generation result into a handle.
    pub(crate) fn decode(key: &CacheKey, audio: GeneratedAudio) -> Result<Self, NarrationError> {
        if audio.bytes.is_empty() {
            return Err(NarrationError::GenerationFailed(
                "generation returned no audio".to_string(),
            ));
        }

        let mime_type = if audio.mime_type.trim().is_empty() {
            "application/octet-stream".to_string()
        } else {
            audio.mime_type.trim().to_string()
        };

        let duration_ms = if wav::is_wav_mime(&mime_type) {
            let ms = wav::wav_duration_ms(&audio.bytes).map_err(|e| NarrationError::generation(&e))?;
            Some(ms)
        } else {
            None
        };

        Ok(Self {
            inner: Arc::new(HandleInner {
                id: key.content_id().to_string(),
                mime_type,
                bytes: audio.bytes,
                duration_ms,
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Local URL the audio is served under.
    pub fn url(&self) -> String {
        format!("{}/{}", AUDIO_URL_PREFIX, self.inner.id)
    }

    pub fn mime_type(&self) -> &str {
        &self.inner.mime_type
    }

    pub fn bytes(&self) -> Bytes {
        self.inner.bytes.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.bytes.is_empty()
    }

    /// Known for WAV payloads only.
    pub fn duration_ms(&self) -> Option<u64> {
        self.inner.duration_ms
    }

    /// Self-contained `data:` URL for consumers that cannot reach the local route.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.inner.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.inner.bytes)
        )
    }

    pub fn ptr_eq(&self, other: &AudioHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
