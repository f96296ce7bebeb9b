//! Audio capture and muxing
//!
//! Two independently clocked capture channels (microphone and system
//! monitor), a device catalog, and the dual-stream recorder that muxes
//! both into one interleaved stereo WAV.

pub mod channel;
pub mod device;
pub mod recorder;
pub mod wav;

pub use channel::{AudioChunk, CaptureChannel, CaptureSource, ChannelConfig, ChannelFault};
pub use device::{AudioDevice, DeviceCatalog, DeviceClassifier, DeviceRole};
pub use recorder::{
    AudioSourceError, DualStreamRecorder, RecorderConfig, RecorderEvent, RecorderStatus,
    RecordingOutcome, RecordingStatus,
};
pub use wav::{read_wav_channels, wav_duration_secs, StereoWavWriter, WavChannels};
