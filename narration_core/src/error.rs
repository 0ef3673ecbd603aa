use thiserror::Error;

/// Errors surfaced by [`crate::NarrationLoader::load`].
///
/// The type is `Clone` because one failed generation is reported to every
/// caller that joined it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrationError {
    /// Empty text or voice id. A caller bug; retrying will not help.
    #[error("invalid narration request: {0}")]
    InvalidRequest(&'static str),

    /// The generation service failed, or its output could not be decoded.
    #[error("narration generation failed: {0}")]
    GenerationFailed(String),
}

impl NarrationError {
    /// Whether calling `load` again with the same arguments may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NarrationError::GenerationFailed(_))
    }

    pub(crate) fn generation(err: &anyhow::Error) -> Self {
        NarrationError::GenerationFailed(format!("{err:#}"))
    }
}
