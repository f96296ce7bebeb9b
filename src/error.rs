//! Error types for duoscribe
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the duoscribe application
#[derive(Error, Debug)]
pub enum DuoscribeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio capture error: {0}")]
    Audio(#[from] AudioError),

    #[error("Recording state error: {0}")]
    State(#[from] StateError),

    #[error("Transcription error: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("Transcript data error: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to audio capture
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio device unavailable: {0}. List devices with: duoscribe devices")]
    DeviceUnavailable(String),

    #[error("Audio connection failed: {0}")]
    Connection(String),

    #[error("Audio stream error: {0}")]
    StreamError(String),

    #[error("Capture failed on the {channel} channel: {message}")]
    ChannelCaptureFailed {
        channel: &'static str,
        message: String,
    },

    #[error("Both audio sources failed; recording stopped")]
    BothSourcesFailed,

    #[error("No audio was captured. Check your input devices.")]
    EmptyRecording,

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("WAV file error: {0}")]
    Wav(String),
}

impl From<hound::Error> for AudioError {
    fn from(e: hound::Error) -> Self {
        AudioError::Wav(e.to_string())
    }
}

/// Errors from the recording state machine
///
/// Invalid operations are rejected synchronously and have no side
/// effects; callers can surface them directly.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Cannot {op} while {from}")]
    InvalidTransition {
        from: &'static str,
        op: &'static str,
    },
}

/// Errors related to speech-to-text transcription
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("No whisper model found at {0}. Download a ggml model file first.")]
    ModelUnavailable(String),

    #[error("Whisper initialization failed: {0}")]
    InitFailed(String),

    #[error("Transcription failed: {0}")]
    InferenceFailed(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),
}

/// Errors reading a persisted transcript
#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("Stored transcript is neither structured nor legacy text: {0}")]
    Malformed(String),
}

/// Result type alias using DuoscribeError
pub type Result<T> = std::result::Result<T, DuoscribeError>;
