//! Speaker-attributed transcripts
//!
//! Merging, orchestration, and the persisted storage format.

pub mod merge;
pub mod orchestrator;
pub mod store;

pub use merge::{merge_speaker_segments, Speaker, SpeakerSegment};
pub use orchestrator::{
    MonoTranscript, RecordingHints, TranscriptionOrchestrator, TranscriptionOutcome,
};
pub use store::{parse_stored, SpeakerTranscript, StoredTranscript};
