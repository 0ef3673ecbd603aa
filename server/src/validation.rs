use crate::error::ApiError;

/// Maximum narration text length, in characters
const MAX_TEXT_LENGTH: usize = 5000;
/// Maximum voice id length
const MAX_VOICE_ID_LENGTH: usize = 64;
/// Longest delay a preload may be scheduled with
pub const MAX_PRELOAD_DELAY_MS: u64 = 60_000;

/// Validate a narration request
pub fn validate_narration_request(text: &str, voice_id: &str) -> Result<(), ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::InvalidInput("Text cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Text too long (max {} characters)",
            MAX_TEXT_LENGTH
        )));
    }

    if voice_id.trim().is_empty() {
        return Err(ApiError::InvalidInput("Voice id cannot be empty".to_string()));
    }
    if !is_valid_voice_id(voice_id) {
        return Err(ApiError::InvalidInput(format!(
            "Invalid voice id: {}. Expected up to {} characters of A-Z, a-z, 0-9, '-' or '_'",
            voice_id, MAX_VOICE_ID_LENGTH
        )));
    }

    Ok(())
}

/// Validate a preload delay
pub fn validate_preload_delay(delay_ms: u64) -> Result<(), ApiError> {
    if delay_ms > MAX_PRELOAD_DELAY_MS {
        return Err(ApiError::InvalidInput(format!(
            "Preload delay too long (max {} ms)",
            MAX_PRELOAD_DELAY_MS
        )));
    }
    Ok(())
}

/// Voice ids are opaque service identifiers (e.g. `21m00Tcm4TlvDq8ikWAM`)
fn is_valid_voice_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_VOICE_ID_LENGTH
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
