//! Whisper-based speech-to-text transcription
//!
//! Uses whisper.cpp via the whisper-rs crate for fast, local inference.
//! Timestamps come from the segment API in centiseconds and are
//! converted to milliseconds here.

use super::{SpeechSegment, Transcriber, ENGINE_SAMPLE_RATE};
use crate::config::WhisperConfig;
use crate::error::TranscribeError;
use std::path::{Path, PathBuf};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Whisper-based transcriber
pub struct WhisperTranscriber {
    /// Whisper context (holds the model)
    ctx: WhisperContext,
    language: String,
    translate: bool,
    threads: usize,
}

impl WhisperTranscriber {
    /// Load the configured model. Fails with `ModelUnavailable` when no
    /// model file can be resolved.
    pub fn new(config: &WhisperConfig) -> Result<Self, TranscribeError> {
        let model_path = resolve_model_path(&config.model)?;

        tracing::info!("Loading whisper model from {:?}", model_path);
        let start = std::time::Instant::now();

        let ctx = WhisperContext::new_with_params(
            model_path
                .to_str()
                .ok_or_else(|| TranscribeError::ModelUnavailable(model_path.display().to_string()))?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| TranscribeError::InitFailed(e.to_string()))?;

        tracing::info!("Model loaded in {:.2}s", start.elapsed().as_secs_f32());

        let threads = config.threads.unwrap_or_else(|| num_cpus::get().min(4));

        Ok(Self {
            ctx,
            language: config.language.clone(),
            translate: config.translate,
            threads,
        })
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<Vec<SpeechSegment>, TranscribeError> {
        // An empty channel is a valid single-speaker meeting, not an error
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let samples = if sample_rate != ENGINE_SAMPLE_RATE {
            super::resample_to_engine_rate(samples, sample_rate)?
        } else {
            samples.to_vec()
        };

        let duration_secs = samples.len() as f32 / ENGINE_SAMPLE_RATE as f32;
        tracing::debug!(
            "Transcribing {:.2}s of audio ({} samples)",
            duration_secs,
            samples.len()
        );
        let start = std::time::Instant::now();

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| TranscribeError::InferenceFailed(e.to_string()))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        if self.language == "auto" {
            params.set_language(None);
        } else {
            params.set_language(Some(&self.language));
        }
        params.set_translate(self.translate);
        params.set_n_threads(self.threads as i32);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_suppress_blank(true);
        params.set_suppress_nst(true);

        state
            .full(params, &samples)
            .map_err(|e| TranscribeError::InferenceFailed(e.to_string()))?;

        let mut segments = Vec::new();
        for segment in state.as_iter() {
            let text = segment
                .to_str()
                .map_err(|e| TranscribeError::InferenceFailed(e.to_string()))?
                .trim()
                .to_string();
            if text.is_empty() {
                continue;
            }
            // centiseconds -> milliseconds
            segments.push(SpeechSegment {
                start_ms: segment.start_timestamp().max(0) as u64 * 10,
                end_ms: segment.end_timestamp().max(0) as u64 * 10,
                text,
            });
        }

        tracing::info!(
            "Transcribed {:.2}s of audio into {} segments in {:.2}s",
            duration_secs,
            segments.len(),
            start.elapsed().as_secs_f32()
        );

        Ok(segments)
    }
}

/// Resolve a model short name or explicit path to a model file.
///
/// Short names like "base.en" are expanded to `ggml-<name>.bin` and
/// probed across conventional locations, the first match winning.
pub fn resolve_model_path(model: &str) -> Result<PathBuf, TranscribeError> {
    let as_path = Path::new(model);
    if as_path.is_absolute() || model.ends_with(".bin") {
        if as_path.exists() {
            return Ok(as_path.to_path_buf());
        }
        return Err(TranscribeError::ModelUnavailable(model.to_string()));
    }

    let file_name = format!("ggml-{}.bin", model);
    let candidates = [
        Some(crate::config::data_dir().join("models").join(&file_name)),
        dirs::home_dir().map(|h| h.join(".duoscribe/models").join(&file_name)),
        Some(PathBuf::from("/usr/local/share/duoscribe/models").join(&file_name)),
        Some(PathBuf::from("./models").join(&file_name)),
    ];

    for candidate in candidates.into_iter().flatten() {
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(TranscribeError::ModelUnavailable(
        crate::config::data_dir()
            .join("models")
            .join(&file_name)
            .display()
            .to_string(),
    ))
}
