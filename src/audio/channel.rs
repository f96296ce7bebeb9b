//! Single-source audio capture channel
//!
//! Owns one cpal input stream running on a dedicated thread
//! (cpal::Stream is not Send, so the stream lives and dies on that
//! thread and everything else communicates through channels). The
//! stream callback downmixes to mono, resamples to the session rate,
//! and pushes chunks into a bounded queue.
//!
//! Real-time constraints: the callback never blocks and never
//! allocates unboundedly. When the queue is full the oldest unconsumed
//! chunk is dropped and counted as drift. While paused, samples are
//! discarded at the source rather than buffered, so a long pause costs
//! no memory.
//!
//! A device failure mid-capture marks the channel inactive and reports
//! a fault; it never tears down a sibling channel.

use crate::error::AudioError;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

/// Which capture source a chunk or fault came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    /// The local user's microphone
    Mic,
    /// The system monitor/loopback source (remote participants)
    System,
}

impl CaptureSource {
    pub fn as_str(self) -> &'static str {
        match self {
            CaptureSource::Mic => "mic",
            CaptureSource::System => "system",
        }
    }
}

impl std::fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable slice of mono samples at the session rate.
/// Sequence numbers are per-channel monotonic; a gap means chunks were
/// dropped under backpressure.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub source: CaptureSource,
    pub seq: u64,
    pub samples: Vec<f32>,
}

/// Mid-capture failure notification, raised from the stream error
/// callback. The recorder decides whether recording continues.
#[derive(Debug, Clone)]
pub struct ChannelFault {
    pub source: CaptureSource,
    pub message: String,
}

/// Capture parameters shared by both channels of a session
#[derive(Debug, Clone, Copy)]
pub struct ChannelConfig {
    /// Rate chunks are resampled to before queueing
    pub session_rate: u32,
    /// Bounded queue capacity in chunks
    pub queue_capacity: usize,
}

/// How often (in dropped chunks) to log a drift warning
const DROP_WARN_EVERY: u64 = 50;

/// One hardware capture stream bound to a device
///
/// Not restartable: once closed, a new channel must be opened.
pub struct CaptureChannel {
    source: CaptureSource,
    device_name: String,
    chunks: Receiver<AudioChunk>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    thread: Option<thread::JoinHandle<()>>,
}

impl CaptureChannel {
    /// Bind to a device and start capturing. Fails if the device's
    /// default input config can't be read or the stream can't be built.
    pub fn open(
        device: cpal::Device,
        source: CaptureSource,
        config: ChannelConfig,
        fault_tx: Sender<ChannelFault>,
    ) -> Result<Self, AudioError> {
        use cpal::traits::DeviceTrait;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let supported = device
            .default_input_config()
            .map_err(|e| AudioError::Connection(e.to_string()))?;
        tracing::debug!(
            "{} device {:?}: {} Hz, {} channel(s), {:?}",
            source,
            device_name,
            supported.sample_rate().0,
            supported.channels(),
            supported.sample_format()
        );

        let (tx, rx) = bounded::<AudioChunk>(config.queue_capacity);
        let running = Arc::new(AtomicBool::new(true));
        let paused = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicBool::new(true));
        let dropped = Arc::new(AtomicU64::new(0));

        // The thread reports stream construction success/failure back
        // before entering its keep-alive loop.
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), AudioError>>();

        let params = CaptureParams {
            source,
            tx,
            drop_rx: rx.clone(),
            running: running.clone(),
            paused: paused.clone(),
            active: active.clone(),
            dropped: dropped.clone(),
            fault_tx,
            session_rate: config.session_rate,
        };

        let run_flag = running.clone();
        let thread = thread::spawn(move || {
            capture_thread(device, supported, params, run_flag, ready_tx);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(AudioError::StreamError(format!(
                    "{} capture thread exited before starting",
                    source
                )));
            }
        }

        tracing::info!("{} capture started on {:?}", source, device_name);

        Ok(Self {
            source,
            device_name,
            chunks: rx,
            running,
            paused,
            active,
            dropped,
            thread: Some(thread),
        })
    }

    /// The infinite chunk sequence. Receivers can be cloned, but the
    /// writer is the only intended consumer.
    pub fn chunks(&self) -> Receiver<AudioChunk> {
        self.chunks.clone()
    }

    /// Discard samples at the source until resumed
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// False once the underlying device has failed
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Shared liveness flag, observed by the writer thread
    pub(crate) fn active_handle(&self) -> Arc<AtomicBool> {
        self.active.clone()
    }

    /// Chunks dropped under backpressure so far
    pub fn dropped_chunks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn source(&self) -> CaptureSource {
        self.source
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Release the device. Idempotent; the channel cannot be reopened.
    pub fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
            tracing::debug!("{} capture closed", self.source);
        }
    }
}

impl Drop for CaptureChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// State moved into the capture thread and its callbacks
struct CaptureParams {
    source: CaptureSource,
    tx: Sender<AudioChunk>,
    /// Receiver clone used to pop the oldest chunk on overflow
    drop_rx: Receiver<AudioChunk>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    fault_tx: Sender<ChannelFault>,
    session_rate: u32,
}

fn capture_thread(
    device: cpal::Device,
    supported: cpal::SupportedStreamConfig,
    params: CaptureParams,
    running: Arc<AtomicBool>,
    ready_tx: std::sync::mpsc::Sender<Result<(), AudioError>>,
) {
    use cpal::traits::StreamTrait;

    let source = params.source;
    let stream_config = cpal::StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };
    let source_rate = supported.sample_rate().0;
    let source_channels = supported.channels() as usize;

    let stream_result = match supported.sample_format() {
        cpal::SampleFormat::F32 => {
            build_stream::<f32>(&device, &stream_config, params, source_rate, source_channels)
        }
        cpal::SampleFormat::I16 => {
            build_stream::<i16>(&device, &stream_config, params, source_rate, source_channels)
        }
        cpal::SampleFormat::U16 => {
            build_stream::<u16>(&device, &stream_config, params, source_rate, source_channels)
        }
        format => Err(AudioError::UnsupportedFormat(format!("{:?}", format))),
    };

    let stream = match stream_result {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Keep the stream alive; control signals take effect at the next
    // chunk boundary, which is bounded by the device buffer size.
    while running.load(Ordering::SeqCst) {
        thread::sleep(std::time::Duration::from_millis(50));
    }

    drop(stream);
    tracing::debug!("{} capture thread stopped", source);
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    params: CaptureParams,
    source_rate: u32,
    source_channels: usize,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    use cpal::traits::DeviceTrait;

    let CaptureParams {
        source,
        tx,
        drop_rx,
        running,
        paused,
        active,
        dropped,
        fault_tx,
        session_rate,
    } = params;

    let err_active = active.clone();
    let err_fn = move |err: cpal::StreamError| {
        // Only the first failure flips the flag and raises a fault
        if err_active.swap(false, Ordering::SeqCst) {
            tracing::error!("{} stream error: {}", source, err);
            let _ = fault_tx.send(ChannelFault {
                source,
                message: err.to_string(),
            });
        }
    };

    let mut seq: u64 = 0;
    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if !running.load(Ordering::Relaxed)
                    || paused.load(Ordering::Relaxed)
                    || !active.load(Ordering::Relaxed)
                {
                    return;
                }

                let mono = downmix_to_mono(data, source_channels);
                let samples = resample_linear(&mono, source_rate, session_rate);

                seq += 1;
                enqueue_drop_oldest(
                    &tx,
                    &drop_rx,
                    AudioChunk {
                        source,
                        seq,
                        samples,
                    },
                    &dropped,
                );
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))?;

    Ok(stream)
}

/// Convert an interleaved frame slice to f32 mono
fn downmix_to_mono<T>(data: &[T], channels: usize) -> Vec<f32>
where
    T: cpal::Sample,
    f32: cpal::FromSample<T>,
{
    if channels <= 1 {
        return data
            .iter()
            .map(|&s| <f32 as cpal::FromSample<T>>::from_sample_(s))
            .collect();
    }
    data.chunks(channels)
        .map(|frame| {
            let sum: f32 = frame
                .iter()
                .map(|&s| <f32 as cpal::FromSample<T>>::from_sample_(s))
                .sum();
            sum / frame.len() as f32
        })
        .collect()
}

/// Linear interpolation resampling. Adequate for capture alignment;
/// transcription input goes through sinc resampling instead.
pub(crate) fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let out_len = (samples.len() as f64 * ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src = i as f64 / ratio;
        let idx = src.floor() as usize;
        let next = (idx + 1).min(samples.len() - 1);
        let frac = (src - idx as f64) as f32;
        let sample = samples.get(idx).copied().unwrap_or(0.0) * (1.0 - frac)
            + samples[next] * frac;
        out.push(sample);
    }

    out
}

/// Push a chunk without ever blocking: when the queue is full, pop the
/// oldest chunk to make room and count it as dropped.
fn enqueue_drop_oldest(
    tx: &Sender<AudioChunk>,
    rx: &Receiver<AudioChunk>,
    chunk: AudioChunk,
    dropped: &AtomicU64,
) {
    let mut chunk = chunk;
    loop {
        match tx.try_send(chunk) {
            Ok(()) => return,
            Err(TrySendError::Full(returned)) => {
                chunk = returned;
                if rx.try_recv().is_ok() {
                    let total = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    if total % DROP_WARN_EVERY == 1 {
                        tracing::warn!(
                            "{} writer falling behind: {} chunks dropped (drift)",
                            chunk.source,
                            total
                        );
                    }
                }
                // Queue may have been drained meanwhile; retry either way
            }
            Err(TrySendError::Disconnected(_)) => return,
        }
    }
}

/// Build an unbounded fault channel shared by a session's capture
/// channels
pub fn fault_channel() -> (Sender<ChannelFault>, Receiver<ChannelFault>) {
    unbounded()
}
