//! Speaker segment merging
//!
//! Combines two per-channel segment sequences into one globally
//! time-ordered, speaker-labeled sequence with overlap flags. Each
//! input is already ordered by construction of the recognizer, so a
//! stable two-pointer merge suffices; no re-sort is needed.

use crate::transcribe::SpeechSegment;
use serde::{Deserialize, Serialize};

/// Which meeting participant a segment is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    /// The microphone channel: the local user
    Me,
    /// The system audio channel: remote participants
    Them,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::Me => f.write_str("Me"),
            Speaker::Them => f.write_str("Them"),
        }
    }
}

/// A single transcribed utterance with speaker attribution.
/// Immutable once produced by the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerSegment {
    pub speaker: Speaker,
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub is_overlapping: bool,
}

impl SpeakerSegment {
    fn from_speech(speaker: Speaker, segment: SpeechSegment) -> Self {
        Self {
            speaker,
            text: segment.text,
            start_ms: segment.start_ms,
            end_ms: segment.end_ms,
            is_overlapping: false,
        }
    }
}

/// Merge mic ("Me") and system ("Them") segment sequences into one
/// sequence ordered by start time.
///
/// Ties on `start_ms` order `Me` before `Them` so the merge is
/// deterministic. Adjacent segments from different speakers whose
/// `[start, end)` intervals intersect by more than `tolerance_ms` are
/// both flagged as overlapping; overlap is a property of the pair.
/// Either input may be empty (a single-speaker meeting).
pub fn merge_speaker_segments(
    mic: Vec<SpeechSegment>,
    system: Vec<SpeechSegment>,
    tolerance_ms: u64,
) -> Vec<SpeakerSegment> {
    let mut merged = Vec::with_capacity(mic.len() + system.len());

    let mut mic_iter = mic.into_iter().peekable();
    let mut system_iter = system.into_iter().peekable();

    loop {
        match (mic_iter.peek(), system_iter.peek()) {
            (Some(m), Some(s)) => {
                // Me wins ties so the merge order is documented and stable
                if m.start_ms <= s.start_ms {
                    merged.push(SpeakerSegment::from_speech(
                        Speaker::Me,
                        mic_iter.next().unwrap(),
                    ));
                } else {
                    merged.push(SpeakerSegment::from_speech(
                        Speaker::Them,
                        system_iter.next().unwrap(),
                    ));
                }
            }
            (Some(_), None) => merged.push(SpeakerSegment::from_speech(
                Speaker::Me,
                mic_iter.next().unwrap(),
            )),
            (None, Some(_)) => merged.push(SpeakerSegment::from_speech(
                Speaker::Them,
                system_iter.next().unwrap(),
            )),
            (None, None) => break,
        }
    }

    flag_overlaps(&mut merged, tolerance_ms);
    merged
}

/// Flag adjacent cross-speaker pairs whose intervals intersect by more
/// than the tolerance
fn flag_overlaps(segments: &mut [SpeakerSegment], tolerance_ms: u64) {
    for i in 1..segments.len() {
        if segments[i - 1].speaker == segments[i].speaker {
            continue;
        }
        // segments are ordered by start, so the intersection of the
        // pair is bounded below by the later start
        let intersection = segments[i - 1]
            .end_ms
            .min(segments[i].end_ms)
            .saturating_sub(segments[i].start_ms);
        if intersection > tolerance_ms {
            segments[i - 1].is_overlapping = true;
            segments[i].is_overlapping = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start_ms: u64, end_ms: u64, text: &str) -> SpeechSegment {
        SpeechSegment {
            start_ms,
            end_ms,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_overlapping_pair_flags_both() {
        let merged = merge_speaker_segments(
            vec![seg(0, 1000, "hi")],
            vec![seg(500, 1500, "hello")],
            0,
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].speaker, Speaker::Me);
        assert_eq!(merged[0].start_ms, 0);
        assert_eq!(merged[1].speaker, Speaker::Them);
        assert_eq!(merged[1].start_ms, 500);
        assert!(merged[0].is_overlapping);
        assert!(merged[1].is_overlapping);
    }

    #[test]
    fn test_disjoint_segments_not_flagged() {
        let merged = merge_speaker_segments(
            vec![seg(0, 1000, "a")],
            vec![seg(2000, 3000, "b")],
            0,
        );
        assert_eq!(merged.len(), 2);
        assert!(!merged[0].is_overlapping);
        assert!(!merged[1].is_overlapping);
    }

    #[test]
    fn test_touching_intervals_do_not_overlap() {
        // [0, 1000) and [1000, 2000) share only the boundary point
        let merged =
            merge_speaker_segments(vec![seg(0, 1000, "a")], vec![seg(1000, 2000, "b")], 0);
        assert!(!merged[0].is_overlapping);
        assert!(!merged[1].is_overlapping);
    }

    #[test]
    fn test_tie_break_me_before_them() {
        let merged =
            merge_speaker_segments(vec![seg(100, 200, "mine")], vec![seg(100, 200, "theirs")], 0);
        assert_eq!(merged[0].speaker, Speaker::Me);
        assert_eq!(merged[1].speaker, Speaker::Them);
    }

    #[test]
    fn test_result_ordered_by_start() {
        let merged = merge_speaker_segments(
            vec![seg(0, 500, "a"), seg(2000, 2500, "c"), seg(5000, 5500, "e")],
            vec![seg(1000, 1500, "b"), seg(3000, 3500, "d")],
            0,
        );
        let starts: Vec<u64> = merged.iter().map(|s| s.start_ms).collect();
        assert_eq!(starts, vec![0, 1000, 2000, 3000, 5000]);
        let texts: Vec<&str> = merged.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_empty_system_channel_is_valid() {
        let merged = merge_speaker_segments(vec![seg(0, 1000, "solo")], Vec::new(), 0);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].speaker, Speaker::Me);
        assert!(!merged[0].is_overlapping);
    }

    #[test]
    fn test_empty_mic_channel_is_valid() {
        let merged = merge_speaker_segments(Vec::new(), vec![seg(0, 1000, "them")], 0);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].speaker, Speaker::Them);
    }

    #[test]
    fn test_both_empty() {
        assert!(merge_speaker_segments(Vec::new(), Vec::new(), 0).is_empty());
    }

    #[test]
    fn test_same_speaker_overlap_not_flagged() {
        // back-to-back recognizer segments from one channel can nudge
        // into each other; that is not cross-speaker overlap
        let merged = merge_speaker_segments(
            vec![seg(0, 1100, "one"), seg(1000, 2000, "two")],
            Vec::new(),
            0,
        );
        assert!(!merged[0].is_overlapping);
        assert!(!merged[1].is_overlapping);
    }

    #[test]
    fn test_tolerance_suppresses_small_intersections() {
        let merged = merge_speaker_segments(
            vec![seg(0, 1000, "a")],
            vec![seg(900, 2000, "b")],
            150,
        );
        // 100ms intersection is within the 150ms tolerance
        assert!(!merged[0].is_overlapping);
        assert!(!merged[1].is_overlapping);

        let merged =
            merge_speaker_segments(vec![seg(0, 1000, "a")], vec![seg(800, 2000, "b")], 150);
        assert!(merged[0].is_overlapping);
        assert!(merged[1].is_overlapping);
    }

    #[test]
    fn test_interleaved_conversation_flags_each_pair() {
        let merged = merge_speaker_segments(
            vec![seg(0, 1200, "a"), seg(2000, 3000, "c")],
            vec![seg(1000, 2100, "b")],
            0,
        );
        // b overlaps both a and c
        assert!(merged.iter().all(|s| s.is_overlapping));
    }

    #[test]
    fn test_merge_times_non_decreasing_invariant() {
        let merged = merge_speaker_segments(
            vec![seg(0, 100, "a"), seg(50, 150, "b"), seg(500, 600, "c")],
            vec![seg(20, 80, "x"), seg(400, 450, "y")],
            0,
        );
        for pair in merged.windows(2) {
            assert!(pair[0].start_ms <= pair[1].start_ms);
        }
    }

    #[test]
    fn test_speaker_display_labels() {
        assert_eq!(Speaker::Me.to_string(), "Me");
        assert_eq!(Speaker::Them.to_string(), "Them");
    }
}
