//! Speech-to-text transcription boundary
//!
//! The pipeline treats the recognizer as an opaque engine: mono audio
//! in, ordered timestamped segments out. whisper.cpp via the whisper-rs
//! crate is the shipped implementation.

pub mod whisper;

use crate::config::WhisperConfig;
use crate::error::TranscribeError;

/// Sample rate the speech engine expects
pub const ENGINE_SAMPLE_RATE: u32 = 16_000;

/// One recognized utterance with engine timestamps, relative to the
/// start of the audio buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechSegment {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

/// Trait for speech-to-text implementations
///
/// Synchronous and stateless per call; a shared reference can serve
/// concurrent invocations. Returned segments are ordered by start time.
pub trait Transcriber: Send + Sync {
    fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<Vec<SpeechSegment>, TranscribeError>;
}

/// Factory function to create the configured transcription engine.
/// Fails with `ModelUnavailable` before any audio is touched, so a
/// recording can always be kept for a later retry.
pub fn create_transcriber(config: &WhisperConfig) -> Result<Box<dyn Transcriber>, TranscribeError> {
    Ok(Box::new(whisper::WhisperTranscriber::new(config)?))
}

/// Whether a usable model is resolvable for the given config
pub fn model_available(config: &WhisperConfig) -> bool {
    whisper::resolve_model_path(&config.model).is_ok()
}

/// Sinc resampling for transcription input. Capture-path alignment uses
/// cheap linear resampling; this is the higher-quality pass applied
/// once per channel at consumption time.
pub fn resample_to_engine_rate(
    samples: &[f32],
    from_rate: u32,
) -> Result<Vec<f32>, TranscribeError> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
        WindowFunction,
    };

    if from_rate == ENGINE_SAMPLE_RATE || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        ENGINE_SAMPLE_RATE as f64 / from_rate as f64,
        2.0,
        params,
        samples.len(),
        1,
    )
    .map_err(|e| TranscribeError::AudioFormat(e.to_string()))?;

    let waves_in = vec![samples.to_vec()];
    let waves_out = resampler
        .process(&waves_in, None)
        .map_err(|e| TranscribeError::AudioFormat(e.to_string()))?;

    Ok(waves_out.into_iter().next().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_identity_at_engine_rate() {
        let samples = vec![0.1, 0.2, 0.3];
        let out = resample_to_engine_rate(&samples, ENGINE_SAMPLE_RATE).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn test_resample_empty_is_empty() {
        assert!(resample_to_engine_rate(&[], 48000).unwrap().is_empty());
    }

    #[test]
    fn test_resample_downsamples_to_engine_rate() {
        let samples = vec![0.0f32; 48000];
        let out = resample_to_engine_rate(&samples, 48000).unwrap();
        // one second of audio stays roughly one second long
        let expected = ENGINE_SAMPLE_RATE as f32;
        assert!((out.len() as f32 - expected).abs() / expected < 0.05);
    }
}
