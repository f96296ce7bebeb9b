//! WAV muxing and demuxing for recording sessions
//!
//! The session artifact is an interleaved 16-bit PCM WAV at the session
//! sample rate: channel 0 = microphone, channel 1 = system audio,
//! silence-filled wherever a source was unavailable.
//!
//! Only the recorder's writer thread ever holds a `StereoWavWriter`;
//! capture callbacks stay on the other side of the chunk queues.

use crate::error::AudioError;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::collections::VecDeque;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Staged-buffer stereo WAV writer
///
/// Chunks from the two capture queues land in per-channel staging
/// buffers; frames are only written once both channels have samples
/// for the frame (or one channel is known dead, in which case it is
/// zero-filled). A lagging live channel is therefore staged, not
/// padded, preserving wall-clock alignment between the channels.
pub struct StereoWavWriter {
    writer: WavWriter<BufWriter<File>>,
    left: VecDeque<f32>,
    right: VecDeque<f32>,
    frames_written: u64,
    sample_rate: u32,
    /// Staged-sample cap per channel before the sibling is presumed
    /// stalled and the gap is zero-filled (0.5 s of audio)
    max_imbalance: usize,
}

impl StereoWavWriter {
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self, AudioError> {
        let spec = WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path, spec)?;
        Ok(Self {
            writer,
            left: VecDeque::new(),
            right: VecDeque::new(),
            frames_written: 0,
            sample_rate,
            max_imbalance: sample_rate as usize / 2,
        })
    }

    /// Stage microphone samples (channel 0)
    pub fn stage_left(&mut self, samples: &[f32]) {
        self.left.extend(samples);
    }

    /// Stage system-audio samples (channel 1)
    pub fn stage_right(&mut self, samples: &[f32]) {
        self.right.extend(samples);
    }

    /// Write every frame that is ready given which channels are live.
    ///
    /// Both live: the common staged prefix is written and the lagging
    /// remainder stays staged. One live: the live channel drains fully
    /// against silence. A live channel that leaves its sibling staged
    /// beyond the imbalance cap is treated as stalled and the gap is
    /// zero-filled with a drift warning.
    pub fn write_ready(&mut self, left_live: bool, right_live: bool) -> Result<(), AudioError> {
        match (left_live, right_live) {
            (true, true) => {
                let common = self.left.len().min(self.right.len());
                for _ in 0..common {
                    let l = self.left.pop_front().unwrap_or(0.0);
                    let r = self.right.pop_front().unwrap_or(0.0);
                    self.write_frame(l, r)?;
                }
                self.spill_imbalance()?;
            }
            (true, false) => {
                while let Some(l) = self.left.pop_front() {
                    self.write_frame(l, 0.0)?;
                }
                self.right.clear();
            }
            (false, true) => {
                while let Some(r) = self.right.pop_front() {
                    self.write_frame(0.0, r)?;
                }
                self.left.clear();
            }
            (false, false) => {}
        }
        Ok(())
    }

    /// Zero-fill past the imbalance cap when one live channel has
    /// stalled without reporting an error
    fn spill_imbalance(&mut self) -> Result<(), AudioError> {
        if self.left.len() > self.max_imbalance {
            let excess = self.left.len() - self.max_imbalance;
            tracing::warn!(
                "system channel stalled; zero-filling {} frames (drift)",
                excess
            );
            for _ in 0..excess {
                let l = self.left.pop_front().unwrap_or(0.0);
                self.write_frame(l, 0.0)?;
            }
        }
        if self.right.len() > self.max_imbalance {
            let excess = self.right.len() - self.max_imbalance;
            tracing::warn!("mic channel stalled; zero-filling {} frames (drift)", excess);
            for _ in 0..excess {
                let r = self.right.pop_front().unwrap_or(0.0);
                self.write_frame(0.0, r)?;
            }
        }
        Ok(())
    }

    /// Flush all remaining staged samples, zero-filling the shorter
    /// channel. Called once at session end.
    pub fn drain_all(&mut self) -> Result<(), AudioError> {
        while !self.left.is_empty() || !self.right.is_empty() {
            let l = self.left.pop_front().unwrap_or(0.0);
            let r = self.right.pop_front().unwrap_or(0.0);
            self.write_frame(l, r)?;
        }
        Ok(())
    }

    fn write_frame(&mut self, left: f32, right: f32) -> Result<(), AudioError> {
        self.writer.write_sample(to_i16(left))?;
        self.writer.write_sample(to_i16(right))?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames_written as f64 / self.sample_rate as f64
    }

    /// Finish the WAV header and close the file
    pub fn finalize(self) -> Result<u64, AudioError> {
        let frames = self.frames_written;
        self.writer.finalize()?;
        Ok(frames)
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Demultiplexed contents of a recording file
#[derive(Debug, Clone)]
pub struct WavChannels {
    pub sample_rate: u32,
    /// One mono buffer per channel, in file channel order
    pub channels: Vec<Vec<f32>>,
}

impl WavChannels {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Read a recording and split it into per-channel mono f32 buffers,
/// normalizing integer PCM to [-1.0, 1.0]
pub fn read_wav_channels(path: &Path) -> Result<WavChannels, AudioError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channel_count = spec.channels as usize;
    if channel_count == 0 {
        return Err(AudioError::Wav("file reports zero channels".to_string()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .filter_map(|s| s.ok())
                .map(|s| s as f32 / max_val)
                .collect()
        }
        SampleFormat::Float => reader.samples::<f32>().filter_map(|s| s.ok()).collect(),
    };

    let frames = interleaved.len() / channel_count;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for frame in interleaved.chunks_exact(channel_count) {
        for (ch, &sample) in frame.iter().enumerate() {
            channels[ch].push(sample);
        }
    }

    Ok(WavChannels {
        sample_rate: spec.sample_rate,
        channels,
    })
}

/// Duration of a recording in seconds (frames / rate)
pub fn wav_duration_secs(path: &Path) -> Result<f64, AudioError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}
