// Command-line interface definitions for duoscribe
//
// This module is separate so the parsed types can be reused by
// integration code without pulling in main.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "duoscribe")]
#[command(author, version, about = "Dual-source meeting recorder with speaker-attributed transcription")]
#[command(long_about = "
Duoscribe records a meeting from two sources at once - your microphone
and the system audio (remote participants) - into one stereo WAV, then
transcribes each channel separately and merges the results into a
time-ordered transcript labeled Me/Them, with overlapping speech
flagged.

USAGE:
  duoscribe devices              # find your mic and monitor source
  duoscribe record               # record until Ctrl+C
  duoscribe transcribe FILE      # transcribe a recording
  duoscribe show FILE            # render a stored transcript
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Override whisper model (tiny, base.en, small, ... or a path)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List audio input devices and their detected roles
    Devices {
        /// Only list devices with this role: "mic" or "monitor"
        #[arg(long, value_name = "ROLE")]
        role: Option<String>,
    },

    /// Record a meeting until Ctrl+C (or a duration limit)
    Record {
        /// Meeting identifier (defaults to a fresh UUID)
        #[arg(long, value_name = "ID")]
        meeting_id: Option<String>,

        /// Microphone device index (overrides config/auto-detection)
        #[arg(long, value_name = "INDEX")]
        mic_device: Option<usize>,

        /// System audio device index (overrides config/auto-detection)
        #[arg(long, value_name = "INDEX")]
        system_device: Option<usize>,

        /// Skip system audio capture (mic-only session)
        #[arg(long)]
        no_system_audio: bool,

        /// Stop automatically after this many seconds
        #[arg(long, value_name = "SECS")]
        max_duration: Option<u64>,

        /// Transcribe immediately after stopping
        #[arg(long)]
        transcribe: bool,
    },

    /// Transcribe a recorded meeting WAV
    Transcribe {
        /// Path to the recording
        file: PathBuf,

        /// Skip the mic channel (it was not captured)
        #[arg(long)]
        no_mic: bool,

        /// Skip the system channel (it was not captured)
        #[arg(long)]
        no_system: bool,
    },

    /// Render a stored transcript (structured or legacy)
    Show {
        /// Path to a file holding the persisted transcript value
        file: PathBuf,
    },

    /// Show current configuration
    Config,
}
