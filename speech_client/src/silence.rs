use async_trait::async_trait;
use narration_core::{wav, AudioGenerationClient, GeneratedAudio};

/// Local stand-in backend that "speaks" silence for roughly as long as the
/// text would take to read aloud.
#[derive(Debug, Clone)]
pub struct SilenceClient {
    pub sample_rate: u32,
    pub ms_per_word: u64,
}

impl Default for SilenceClient {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            ms_per_word: 350,
        }
    }
}

impl SilenceClient {
    pub fn duration_ms_for(&self, text: &str) -> u64 {
        let words = text.split_whitespace().count().max(1) as u64;
        words * self.ms_per_word
    }
}

#[async_trait]
impl AudioGenerationClient for SilenceClient {
    async fn generate(&self, text: &str, _voice_id: &str) -> anyhow::Result<GeneratedAudio> {
        let duration_ms = self.duration_ms_for(text);
        let samples = vec![0.0f32; (duration_ms * u64::from(self.sample_rate) / 1000) as usize];
        let bytes = wav::encode_wav(&samples, self.sample_rate)?;
        Ok(GeneratedAudio::new(bytes, "audio/wav"))
    }
}
