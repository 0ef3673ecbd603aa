use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpeechClientError {
    #[error("TTS API key is not configured")]
    MissingApiKey,

    #[error("TTS request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TTS service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("TTS service returned an empty body")]
    EmptyBody,
}
