//! Configuration loading and types for duoscribe
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/duoscribe/config.toml)
//! 3. CLI arguments (highest priority)

use crate::error::DuoscribeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Duoscribe Configuration
#
# Location: ~/.config/duoscribe/config.toml

[audio]
# Microphone device index (omit for auto-detection)
# List devices with: duoscribe devices
# mic_device = 0

# System audio (monitor/loopback) device index (omit for auto-detection)
# system_device = 2

# Disable system audio capture entirely (mic-only sessions)
capture_system_audio = true

# Session sample rate in Hz. Both channels are resampled to this rate
# and the recording file is written at it.
sample_rate = 16000

# Capture queue capacity in chunks. When the writer falls behind, the
# oldest queued chunk is dropped rather than blocking the audio callback.
queue_capacity = 100

[whisper]
# Model to use for transcription: a short name (tiny, base.en, small, ...)
# resolved under the model directory, or an absolute path to a .bin file
model = "base.en"

# Language for transcription ("auto" for auto-detection)
language = "en"

# Translate non-English speech to English
translate = false

# Number of CPU threads for inference (omit for auto-detection)
# threads = 4

[transcript]
# Two segments from different speakers are flagged as overlapping when
# their intervals intersect by more than this many milliseconds.
# 0 means any intersection counts.
overlap_tolerance_ms = 0

[storage]
# Directory for recorded meeting audio (omit for the platform default,
# e.g. ~/.local/share/duoscribe/recordings)
# recordings_dir = "/path/to/recordings"
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub whisper: WhisperConfig,
    #[serde(default)]
    pub transcript: TranscriptConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    /// Microphone device index; None auto-detects the first
    /// microphone-class device
    #[serde(default)]
    pub mic_device: Option<usize>,

    /// System audio device index; None auto-detects the first
    /// monitor-class device
    #[serde(default)]
    pub system_device: Option<usize>,

    /// Whether to capture system audio at all
    #[serde(default = "default_capture_system_audio")]
    pub capture_system_audio: bool,

    /// Session sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Capture queue capacity in chunks
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            mic_device: None,
            system_device: None,
            capture_system_audio: default_capture_system_audio(),
            sample_rate: default_sample_rate(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_capture_system_audio() -> bool {
    true
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_queue_capacity() -> usize {
    100
}

/// Whisper transcription configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhisperConfig {
    /// Model short name or absolute path to a ggml .bin file
    #[serde(default = "default_model")]
    pub model: String,

    /// Language code, or "auto" for auto-detection
    #[serde(default = "default_language")]
    pub language: String,

    /// Translate non-English speech to English
    #[serde(default)]
    pub translate: bool,

    /// CPU threads for inference; None auto-detects
    #[serde(default)]
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            language: default_language(),
            translate: false,
            threads: None,
        }
    }
}

fn default_model() -> String {
    "base.en".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

/// Transcript merge configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriptConfig {
    /// Minimum interval intersection (ms) before two segments from
    /// different speakers are flagged as overlapping
    #[serde(default)]
    pub overlap_tolerance_ms: u64,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            overlap_tolerance_ms: 0,
        }
    }
}

/// Storage locations
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    /// Directory for recorded audio; None uses the platform data dir
    #[serde(default)]
    pub recordings_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the recordings directory, creating it if needed
    pub fn resolve_recordings_dir(&self) -> std::io::Result<PathBuf> {
        let dir = match &self.recordings_dir {
            Some(dir) => dir.clone(),
            None => data_dir().join("recordings"),
        };
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// Platform data directory for duoscribe (models, recordings)
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("duoscribe")
}

/// Default config file path (~/.config/duoscribe/config.toml)
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("duoscribe")
        .join("config.toml")
}

impl Config {
    /// Load configuration from the default location, falling back to
    /// built-in defaults when no file exists
    pub fn load() -> Result<Self, DuoscribeError> {
        Self::load_from(&config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, DuoscribeError> {
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| DuoscribeError::Config(format!("{}: {}", path.display(), e)))?;

        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Write the default config file if none exists yet
    pub fn ensure_default_config() -> Result<PathBuf, DuoscribeError> {
        let path = config_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG)?;
            tracing::info!("Wrote default config to {:?}", path);
        }
        Ok(path)
    }
}
