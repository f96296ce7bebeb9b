//! Recording session state machine
//!
//! The single source of truth for whether a recording is in progress:
//! Idle -> Recording <-> Paused -> Idle, with Recording|Paused -> Error
//! when every capture source has failed.
//!
//! The machine performs no I/O. Transitions are driven by the recorder
//! lifecycle; invalid operations are rejected with
//! [`StateError::InvalidTransition`] rather than silently ignored, so a
//! boundary layer can report misuse (e.g. pausing an idle session)
//! without side effects. `pause`, `resume`, `stop`, and the audio error
//! callback run on different threads, so the recorder holds the machine
//! behind a single mutex.

use crate::error::StateError;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Recording phase with the timing data each phase needs
#[derive(Debug, Clone, Default)]
pub enum RecordingPhase {
    /// No session in progress
    #[default]
    Idle,

    /// Actively capturing audio
    Recording {
        /// When the session started
        started_at: Instant,
        /// Total time spent paused so far
        paused_accum: Duration,
    },

    /// Session open but both channels are discarding samples
    Paused {
        started_at: Instant,
        paused_accum: Duration,
        /// When the current pause began
        paused_at: Instant,
    },

    /// Every capture source failed; session must be torn down
    Error {
        started_at: Instant,
        paused_accum: Duration,
    },
}

impl RecordingPhase {
    /// Short name used in errors and status output
    pub fn name(&self) -> &'static str {
        match self {
            RecordingPhase::Idle => "idle",
            RecordingPhase::Recording { .. } => "recording",
            RecordingPhase::Paused { .. } => "paused",
            RecordingPhase::Error { .. } => "error",
        }
    }
}

/// Timing facts captured when a session finishes
#[derive(Debug, Clone, Copy)]
pub struct SessionTiming {
    /// Wall-clock session length, pauses included
    pub wall_clock: Duration,
    /// Time spent actually capturing (wall clock minus paused intervals)
    pub recorded: Duration,
    /// Whether the session ended in the error phase
    pub errored: bool,
}

/// Point-in-time view of the machine for status queries
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub phase: &'static str,
    /// Seconds of captured audio so far, if a session is open
    pub recorded_secs: Option<u64>,
}

/// Authoritative recording state, consulted by the recorder boundary
/// to reject operations that are invalid in the current phase.
#[derive(Debug, Default)]
pub struct RecordingStateMachine {
    phase: RecordingPhase,
}

impl RecordingStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &RecordingPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, RecordingPhase::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.phase, RecordingPhase::Recording { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.phase, RecordingPhase::Paused { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self.phase, RecordingPhase::Error { .. })
    }

    /// Time spent capturing, excluding paused intervals
    pub fn recorded_duration(&self) -> Option<Duration> {
        match &self.phase {
            RecordingPhase::Idle => None,
            RecordingPhase::Recording {
                started_at,
                paused_accum,
            }
            | RecordingPhase::Error {
                started_at,
                paused_accum,
            } => Some(started_at.elapsed().saturating_sub(*paused_accum)),
            RecordingPhase::Paused {
                started_at,
                paused_accum,
                paused_at,
            } => Some(
                started_at
                    .elapsed()
                    .saturating_sub(*paused_accum)
                    .saturating_sub(paused_at.elapsed()),
            ),
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            phase: self.phase.name(),
            recorded_secs: self.recorded_duration().map(|d| d.as_secs()),
        }
    }

    /// Idle -> Recording
    pub fn begin(&mut self) -> Result<(), StateError> {
        match self.phase {
            RecordingPhase::Idle => {
                self.phase = RecordingPhase::Recording {
                    started_at: Instant::now(),
                    paused_accum: Duration::ZERO,
                };
                Ok(())
            }
            _ => Err(self.invalid("start")),
        }
    }

    /// Recording -> Paused
    pub fn pause(&mut self) -> Result<(), StateError> {
        match self.phase {
            RecordingPhase::Recording {
                started_at,
                paused_accum,
            } => {
                self.phase = RecordingPhase::Paused {
                    started_at,
                    paused_accum,
                    paused_at: Instant::now(),
                };
                Ok(())
            }
            _ => Err(self.invalid("pause")),
        }
    }

    /// Paused -> Recording, folding the pause into the accumulator
    pub fn resume(&mut self) -> Result<(), StateError> {
        match self.phase {
            RecordingPhase::Paused {
                started_at,
                paused_accum,
                paused_at,
            } => {
                self.phase = RecordingPhase::Recording {
                    started_at,
                    paused_accum: paused_accum + paused_at.elapsed(),
                };
                Ok(())
            }
            _ => Err(self.invalid("resume")),
        }
    }

    /// Recording|Paused -> Error. Triggered by the recorder when the
    /// last live capture source fails; a no-op error elsewhere.
    pub fn fail(&mut self) -> Result<(), StateError> {
        match self.phase {
            RecordingPhase::Recording {
                started_at,
                paused_accum,
            } => {
                self.phase = RecordingPhase::Error {
                    started_at,
                    paused_accum,
                };
                Ok(())
            }
            RecordingPhase::Paused {
                started_at,
                paused_accum,
                paused_at,
            } => {
                self.phase = RecordingPhase::Error {
                    started_at,
                    paused_accum: paused_accum + paused_at.elapsed(),
                };
                Ok(())
            }
            _ => Err(self.invalid("fail")),
        }
    }

    /// Recording|Paused|Error -> Idle, yielding the session timing.
    /// Valid from Error so a failed session can still report what it
    /// captured instead of losing the result.
    pub fn finish(&mut self) -> Result<SessionTiming, StateError> {
        let timing = match self.phase {
            RecordingPhase::Recording {
                started_at,
                paused_accum,
            } => SessionTiming {
                wall_clock: started_at.elapsed(),
                recorded: started_at.elapsed().saturating_sub(paused_accum),
                errored: false,
            },
            RecordingPhase::Paused {
                started_at,
                paused_accum,
                paused_at,
            } => {
                let paused_total = paused_accum + paused_at.elapsed();
                SessionTiming {
                    wall_clock: started_at.elapsed(),
                    recorded: started_at.elapsed().saturating_sub(paused_total),
                    errored: false,
                }
            }
            RecordingPhase::Error {
                started_at,
                paused_accum,
            } => SessionTiming {
                wall_clock: started_at.elapsed(),
                recorded: started_at.elapsed().saturating_sub(paused_accum),
                errored: true,
            },
            RecordingPhase::Idle => return Err(self.invalid("stop")),
        };
        self.phase = RecordingPhase::Idle;
        Ok(timing)
    }

    fn invalid(&self, op: &'static str) -> StateError {
        StateError::InvalidTransition {
            from: self.phase.name(),
            op,
        }
    }
}
