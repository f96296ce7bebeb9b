//! Transcription orchestration
//!
//! Turns a stored recording into a transcript: demultiplex the WAV,
//! invoke the speech engine once per captured channel (the two calls
//! share no mutable state and run concurrently), and merge the
//! per-channel segments into one speaker-attributed sequence.
//!
//! The dual/mono decision is a typed outcome rather than exception
//! control flow, so callers can tell "this recording has no speaker
//! separation" apart from "transcription failed".

use super::merge::merge_speaker_segments;
use super::store::SpeakerTranscript;
use crate::audio::wav::read_wav_channels;
use crate::error::{Result, TranscribeError};
use crate::transcribe::{SpeechSegment, Transcriber};
use std::path::Path;
use std::sync::Arc;
use std::thread;

/// What the recorder knew about the session, used to skip channels
/// that were never captured instead of transcribing silence
#[derive(Debug, Clone)]
pub struct RecordingHints {
    pub mic_device: String,
    pub system_device: String,
    pub mic_captured: bool,
    pub system_captured: bool,
}

impl Default for RecordingHints {
    fn default() -> Self {
        Self {
            mic_device: "unknown".to_string(),
            system_device: "unknown".to_string(),
            mic_captured: true,
            system_captured: true,
        }
    }
}

impl From<&crate::audio::recorder::RecordingOutcome> for RecordingHints {
    fn from(outcome: &crate::audio::recorder::RecordingOutcome) -> Self {
        Self {
            mic_device: "unknown".to_string(),
            system_device: "unknown".to_string(),
            mic_captured: outcome.mic_captured,
            system_captured: outcome.system_captured,
        }
    }
}

/// A transcription of a recording without speaker separation
/// (single-channel legacy files)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoTranscript {
    pub segments: Vec<SpeechSegment>,
}

impl MonoTranscript {
    /// Legacy newline-delimited rendering, matching the historical
    /// plain-text storage format
    pub fn to_legacy_text(&self) -> String {
        super::store::render_legacy_lines(&self.segments)
    }
}

/// Typed result of transcribing a recording
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionOutcome {
    /// Speaker-attributed transcript from a two-channel recording
    Dual(SpeakerTranscript),
    /// Plain transcript from a single-channel recording
    Mono(MonoTranscript),
}

/// Demultiplexes recordings and drives the speech engine per channel
pub struct TranscriptionOrchestrator {
    engine: Arc<dyn Transcriber>,
    overlap_tolerance_ms: u64,
}

impl TranscriptionOrchestrator {
    pub fn new(engine: Arc<dyn Transcriber>, overlap_tolerance_ms: u64) -> Self {
        Self {
            engine,
            overlap_tolerance_ms,
        }
    }

    /// Build from configuration. Fails with `ModelUnavailable` before
    /// any audio is read; the recording stays on disk for a retry.
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        let engine = crate::transcribe::create_transcriber(&config.whisper)?;
        Ok(Self::new(
            Arc::from(engine),
            config.transcript.overlap_tolerance_ms,
        ))
    }

    /// Transcribe a stored recording.
    ///
    /// Two-channel files produce a speaker-attributed transcript, with
    /// `has_dual_audio` reflecting whether both sources were actually
    /// captured; channels the recorder reported dead are skipped.
    /// Single-channel files short-circuit to a mono transcript.
    pub fn transcribe_recording(
        &self,
        audio_path: &Path,
        hints: &RecordingHints,
    ) -> Result<TranscriptionOutcome> {
        let wav = read_wav_channels(audio_path)?;
        tracing::info!(
            "Transcribing {:?}: {} channel(s) at {} Hz",
            audio_path,
            wav.channel_count(),
            wav.sample_rate
        );

        if wav.channel_count() < 2 {
            let samples = &wav.channels[0];
            let segments = self.engine.transcribe(samples, wav.sample_rate)?;
            return Ok(TranscriptionOutcome::Mono(MonoTranscript { segments }));
        }

        let mic_samples = hints.mic_captured.then_some(&wav.channels[0]);
        let system_samples = hints.system_captured.then_some(&wav.channels[1]);

        let (mic_segments, system_segments) =
            self.transcribe_pair(mic_samples, system_samples, wav.sample_rate)?;

        let transcript = SpeakerTranscript::new(
            hints.mic_device.clone(),
            hints.system_device.clone(),
            hints.mic_captured && hints.system_captured,
            merge_speaker_segments(mic_segments, system_segments, self.overlap_tolerance_ms),
        );

        Ok(TranscriptionOutcome::Dual(transcript))
    }

    /// Run the engine over both channels concurrently. The engine is
    /// shared immutably; a skipped channel yields no segments.
    fn transcribe_pair(
        &self,
        mic: Option<&Vec<f32>>,
        system: Option<&Vec<f32>>,
        sample_rate: u32,
    ) -> Result<(Vec<SpeechSegment>, Vec<SpeechSegment>)> {
        let engine = self.engine.as_ref();

        let (mic_result, system_result) = thread::scope(|scope| {
            let mic_handle =
                mic.map(|samples| scope.spawn(move || engine.transcribe(samples, sample_rate)));

            let system_result = match system {
                Some(samples) => engine.transcribe(samples, sample_rate),
                None => Ok(Vec::new()),
            };

            let mic_result = match mic_handle {
                Some(handle) => handle.join().unwrap_or_else(|_| {
                    Err(TranscribeError::InferenceFailed(
                        "engine thread panicked".to_string(),
                    ))
                }),
                None => Ok(Vec::new()),
            };

            (mic_result, system_result)
        });

        Ok((mic_result?, system_result?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::merge::Speaker;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine stub that attributes fixed segments based on which
    /// channel's audio it is handed (mic tone positive, system
    /// negative), and counts invocations.
    struct StubEngine {
        calls: AtomicUsize,
    }

    impl StubEngine {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Transcriber for StubEngine {
        fn transcribe(
            &self,
            samples: &[f32],
            _sample_rate: u32,
        ) -> std::result::Result<Vec<SpeechSegment>, TranscribeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let energy: f32 = samples.iter().sum();
            if samples.iter().all(|&s| s == 0.0) {
                return Ok(Vec::new());
            }
            if energy > 0.0 {
                Ok(vec![SpeechSegment {
                    start_ms: 0,
                    end_ms: 1000,
                    text: "from mic".to_string(),
                }])
            } else {
                Ok(vec![SpeechSegment {
                    start_ms: 500,
                    end_ms: 1500,
                    text: "from system".to_string(),
                }])
            }
        }
    }

    struct FailingEngine;

    impl Transcriber for FailingEngine {
        fn transcribe(
            &self,
            _samples: &[f32],
            _sample_rate: u32,
        ) -> std::result::Result<Vec<SpeechSegment>, TranscribeError> {
            Err(TranscribeError::InferenceFailed("boom".to_string()))
        }
    }

    fn write_wav(dir: &tempfile::TempDir, channels: u16, frames: &[(f32, f32)]) -> PathBuf {
        let path = dir.path().join("meeting.wav");
        let spec = WavSpec {
            channels,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for &(l, r) in frames {
            writer.write_sample((l * 32767.0) as i16).unwrap();
            if channels == 2 {
                writer.write_sample((r * 32767.0) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
        path
    }

    fn dual_hints() -> RecordingHints {
        RecordingHints {
            mic_device: "mic".to_string(),
            system_device: "monitor".to_string(),
            mic_captured: true,
            system_captured: true,
        }
    }

    #[test]
    fn test_dual_recording_invokes_engine_per_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(&dir, 2, &vec![(0.5, -0.5); 1600]);
        let engine = Arc::new(StubEngine::new());
        let orchestrator = TranscriptionOrchestrator::new(engine.clone(), 0);

        let outcome = orchestrator
            .transcribe_recording(&path, &dual_hints())
            .unwrap();

        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
        match outcome {
            TranscriptionOutcome::Dual(transcript) => {
                assert!(transcript.has_dual_audio);
                assert_eq!(transcript.segments.len(), 2);
                assert_eq!(transcript.segments[0].speaker, Speaker::Me);
                assert_eq!(transcript.segments[1].speaker, Speaker::Them);
                // (0,1000) and (500,1500) intersect
                assert!(transcript.segments.iter().all(|s| s.is_overlapping));
            }
            TranscriptionOutcome::Mono(_) => panic!("dual file produced mono outcome"),
        }
    }

    #[test]
    fn test_mono_recording_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(&dir, 1, &vec![(0.5, 0.0); 1600]);
        let engine = Arc::new(StubEngine::new());
        let orchestrator = TranscriptionOrchestrator::new(engine.clone(), 0);

        let outcome = orchestrator
            .transcribe_recording(&path, &RecordingHints::default())
            .unwrap();

        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
        match outcome {
            TranscriptionOutcome::Mono(mono) => {
                assert_eq!(mono.segments.len(), 1);
                assert!(mono.to_legacy_text().contains("from mic"));
            }
            TranscriptionOutcome::Dual(_) => panic!("mono file produced dual outcome"),
        }
    }

    #[test]
    fn test_dead_system_channel_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(&dir, 2, &vec![(0.5, 0.0); 1600]);
        let engine = Arc::new(StubEngine::new());
        let orchestrator = TranscriptionOrchestrator::new(engine.clone(), 0);

        let hints = RecordingHints {
            system_captured: false,
            ..dual_hints()
        };
        let outcome = orchestrator.transcribe_recording(&path, &hints).unwrap();

        // only the mic channel reached the engine
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
        match outcome {
            TranscriptionOutcome::Dual(transcript) => {
                assert!(!transcript.has_dual_audio);
                assert_eq!(transcript.segments.len(), 1);
                assert_eq!(transcript.segments[0].speaker, Speaker::Me);
            }
            TranscriptionOutcome::Mono(_) => panic!("expected dual outcome"),
        }
    }

    #[test]
    fn test_engine_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(&dir, 2, &vec![(0.5, -0.5); 1600]);
        let orchestrator = TranscriptionOrchestrator::new(Arc::new(FailingEngine), 0);

        let err = orchestrator
            .transcribe_recording(&path, &dual_hints())
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::DuoscribeError::Transcribe(TranscribeError::InferenceFailed(_))
        ));
    }

    #[test]
    fn test_missing_file_is_audio_error() {
        let orchestrator = TranscriptionOrchestrator::new(Arc::new(StubEngine::new()), 0);
        let err = orchestrator
            .transcribe_recording(Path::new("/nonexistent.wav"), &RecordingHints::default())
            .unwrap_err();
        assert!(matches!(err, crate::error::DuoscribeError::Audio(_)));
    }

    #[test]
    fn test_hints_from_outcome() {
        let outcome = crate::audio::recorder::RecordingOutcome {
            meeting_id: "m1".to_string(),
            output_path: PathBuf::from("m1.wav"),
            duration_secs: 10,
            has_dual_audio: false,
            mic_captured: false,
            system_captured: true,
        };
        let hints = RecordingHints::from(&outcome);
        assert!(!hints.mic_captured);
        assert!(hints.system_captured);
    }
}
