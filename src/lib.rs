//! Duoscribe: dual-source meeting recording and speaker-attributed
//! transcription
//!
//! This library provides the core functionality for:
//! - Enumerating and classifying audio endpoints (mic vs. monitor)
//! - Capturing two independently clocked sources via cpal
//! - Muxing both into one synchronized stereo WAV that survives
//!   partial source failure
//! - Transcribing each channel with whisper.cpp (whisper-rs)
//! - Merging per-channel segments into one Me/Them transcript with
//!   overlap detection
//!
//! # Architecture
//!
//! ```text
//!   ┌───────────────┐      ┌───────────────┐
//!   │ CaptureChannel│      │ CaptureChannel│
//!   │    (mic)      │      │   (system)    │
//!   └───────┬───────┘      └───────┬───────┘
//!           │ bounded queue        │ bounded queue
//!           ▼                      ▼
//!   ┌─────────────────────────────────────────┐
//!   │            writer thread                │   RecordingStateMachine
//!   │  (sole owner of the output file)       │◀─ idle/recording/paused/error
//!   └───────────────────┬─────────────────────┘
//!                       ▼
//!              stereo WAV (ch0=mic, ch1=system)
//!                       │
//!                       ▼
//!   ┌─────────────────────────────────────────┐
//!   │        TranscriptionOrchestrator        │
//!   │   demux → Transcriber ×2 (concurrent)   │
//!   └───────────────────┬─────────────────────┘
//!                       ▼
//!            merge_speaker_segments
//!                       │
//!                       ▼
//!          SpeakerTranscript ("Me"/"Them",
//!           ordered, overlap-flagged)
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod session;
pub mod transcribe;
pub mod transcript;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{DuoscribeError, Result};
