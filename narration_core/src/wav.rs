//! WAV helpers: encoding generated PCM and measuring decoded payloads.

use std::io::Cursor;

use anyhow::Context;

/// MIME types treated as RIFF/WAV when decoding generated audio.
pub const WAV_MIME_TYPES: &[&str] = &["audio/wav", "audio/wave", "audio/x-wav", "audio/vnd.wave"];

pub fn is_wav_mime(mime_type: &str) -> bool {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    WAV_MIME_TYPES.iter().any(|m| m.eq_ignore_ascii_case(essence))
}

/// Encode mono f32 samples as 16-bit PCM WAV.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    // WAV header (44 bytes) + 2 bytes per sample
    let mut cursor = Cursor::new(Vec::<u8>::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).context("wav header write failed")?;

        const I16_MAX_F32: f32 = i16::MAX as f32;
        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * I16_MAX_F32) as i16;
            writer.write_sample(v).context("wav sample write failed")?;
        }
        writer.finalize().context("wav finalize failed")?;
    }

    Ok(cursor.into_inner())
}

/// Duration of a WAV payload in milliseconds.
pub fn wav_duration_ms(bytes: &[u8]) -> anyhow::Result<u64> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).context("not a valid WAV payload")?;
    let spec = reader.spec();
    if spec.sample_rate == 0 || spec.channels == 0 {
        anyhow::bail!("WAV payload declares an empty format");
    }
    // `duration()` counts frames, i.e. samples per channel.
    let frames = u64::from(reader.duration());
    Ok(frames * 1000 / u64::from(spec.sample_rate))
}
