//! Persisted transcript format
//!
//! A speaker transcript is stored as a JSON string in the same field
//! that historically held plain newline-delimited text. Readers attempt
//! a structured parse first and only on failure treat the value as a
//! legacy transcript; a value that is JSON-shaped but does not match
//! the transcript schema is a data-integrity problem, not legacy text.

use super::merge::SpeakerSegment;
use crate::error::TranscriptError;
use serde::{Deserialize, Serialize};

/// Complete transcript with speaker attribution. The terminal artifact
/// of the pipeline, handed to external persistence as a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerTranscript {
    pub version: u32,
    pub mic_device: String,
    pub system_device: String,
    pub has_dual_audio: bool,
    pub segments: Vec<SpeakerSegment>,
}

impl SpeakerTranscript {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(
        mic_device: String,
        system_device: String,
        has_dual_audio: bool,
        segments: Vec<SpeakerSegment>,
    ) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            mic_device,
            system_device,
            has_dual_audio,
            segments,
        }
    }

    /// Serialize to the persisted string form
    pub fn to_stored_string(&self) -> Result<String, TranscriptError> {
        serde_json::to_string(self).map_err(|e| TranscriptError::Malformed(e.to_string()))
    }

    /// Human-readable rendering: one timestamped line per segment,
    /// speaker-labeled, overlaps marked
    pub fn render(&self) -> String {
        self.segments
            .iter()
            .map(|s| {
                format!(
                    "[{}] {}{}: {}",
                    format_timestamp_ms(s.start_ms),
                    s.speaker,
                    if s.is_overlapping { " (overlapping)" } else { "" },
                    s.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A transcript as read back from storage
#[derive(Debug, Clone, PartialEq)]
pub enum StoredTranscript {
    /// Structured speaker transcript
    Structured(SpeakerTranscript),
    /// Plain newline-delimited legacy text
    Legacy(String),
}

/// Parse a persisted transcript value.
///
/// Duck-typed fallback: structured parse first; values that are not
/// JSON objects are legacy text. A JSON object that fails the schema
/// is rejected as malformed so schema drift surfaces as a warning
/// instead of silently rendering JSON as prose.
pub fn parse_stored(value: &str) -> Result<StoredTranscript, TranscriptError> {
    match serde_json::from_str::<SpeakerTranscript>(value) {
        Ok(transcript) => Ok(StoredTranscript::Structured(transcript)),
        Err(e) => {
            if value.trim_start().starts_with('{') {
                Err(TranscriptError::Malformed(e.to_string()))
            } else {
                Ok(StoredTranscript::Legacy(value.to_string()))
            }
        }
    }
}

/// Format milliseconds as `MM:SS.mmm` (legacy line timestamp style)
pub fn format_timestamp_ms(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
}

/// Render plain segments as legacy transcript lines:
/// `[MM:SS.mmm] - [MM:SS.mmm] text`
pub fn render_legacy_lines(segments: &[crate::transcribe::SpeechSegment]) -> String {
    segments
        .iter()
        .map(|s| {
            format!(
                "[{}] - [{}] {}",
                format_timestamp_ms(s.start_ms),
                format_timestamp_ms(s.end_ms),
                s.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::merge::Speaker;

    fn sample_transcript() -> SpeakerTranscript {
        SpeakerTranscript::new(
            "USB Microphone".to_string(),
            "Monitor of Built-in Audio".to_string(),
            true,
            vec![
                SpeakerSegment {
                    speaker: Speaker::Me,
                    text: "hi".to_string(),
                    start_ms: 0,
                    end_ms: 1000,
                    is_overlapping: true,
                },
                SpeakerSegment {
                    speaker: Speaker::Them,
                    text: "hello".to_string(),
                    start_ms: 500,
                    end_ms: 1500,
                    is_overlapping: true,
                },
            ],
        )
    }

    #[test]
    fn test_roundtrip_preserves_segments() {
        let transcript = sample_transcript();
        let stored = transcript.to_stored_string().unwrap();
        match parse_stored(&stored).unwrap() {
            StoredTranscript::Structured(parsed) => {
                assert_eq!(parsed, transcript);
                assert_eq!(parsed.segments.len(), 2);
                assert_eq!(parsed.segments[0].text, "hi");
                assert_eq!(parsed.segments[1].speaker, Speaker::Them);
            }
            StoredTranscript::Legacy(_) => panic!("structured transcript parsed as legacy"),
        }
    }

    #[test]
    fn test_plain_text_routes_to_legacy() {
        let value = "hello world\nthis is just text";
        match parse_stored(value).unwrap() {
            StoredTranscript::Legacy(text) => assert_eq!(text, value),
            StoredTranscript::Structured(_) => panic!("plain text mis-parsed as structured"),
        }
    }

    #[test]
    fn test_legacy_timestamped_lines_route_to_legacy() {
        let value = "[00:00.000] - [00:02.500] hello there\n[00:03.000] - [00:04.000] hi";
        assert!(matches!(
            parse_stored(value).unwrap(),
            StoredTranscript::Legacy(_)
        ));
    }

    #[test]
    fn test_json_object_wrong_schema_is_malformed() {
        let err = parse_stored(r#"{"summary": "not a transcript"}"#).unwrap_err();
        assert!(matches!(err, TranscriptError::Malformed(_)));
    }

    #[test]
    fn test_truncated_json_object_is_malformed() {
        let err = parse_stored(r#"{"version": 1, "mic_device": "x""#).unwrap_err();
        assert!(matches!(err, TranscriptError::Malformed(_)));
    }

    #[test]
    fn test_empty_string_is_legacy() {
        assert!(matches!(
            parse_stored("").unwrap(),
            StoredTranscript::Legacy(_)
        ));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp_ms(0), "00:00.000");
        assert_eq!(format_timestamp_ms(65_250), "01:05.250");
        assert_eq!(format_timestamp_ms(3_600_000), "60:00.000");
    }

    #[test]
    fn test_render_marks_overlap() {
        let rendered = sample_transcript().render();
        assert!(rendered.contains("[00:00.000] Me (overlapping): hi"));
        assert!(rendered.contains("[00:00.500] Them (overlapping): hello"));
    }

    #[test]
    fn test_render_legacy_lines() {
        let segments = vec![crate::transcribe::SpeechSegment {
            start_ms: 1000,
            end_ms: 2500,
            text: "hello".to_string(),
        }];
        assert_eq!(
            render_legacy_lines(&segments),
            "[00:01.000] - [00:02.500] hello"
        );
    }

    #[test]
    fn test_version_field_persisted() {
        let stored = sample_transcript().to_stored_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["has_dual_audio"], true);
    }
}
