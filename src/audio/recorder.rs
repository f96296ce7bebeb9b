//! Dual-stream recorder
//!
//! Coordinates two independently clocked, independently failing capture
//! channels into one synchronized stereo recording. A single writer
//! thread owns the output file; capture callbacks only ever touch their
//! bounded chunk queues, so there are no write races by construction.
//!
//! Partial failure degrades rather than aborts: a dead channel is
//! silence-filled for the rest of the session and the final outcome
//! reports which sources were actually captured. Only the loss of every
//! source is fatal, transitioning the session to the error phase.

use super::channel::{
    fault_channel, AudioChunk, CaptureChannel, CaptureSource, ChannelConfig, ChannelFault,
};
use super::device::{device_by_index, DeviceCatalog};
use super::wav::{wav_duration_secs, StereoWavWriter};
use crate::config::Config;
use crate::error::{AudioError, DuoscribeError, Result, StateError};
use crate::session::{RecordingStateMachine, StateSnapshot};
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::mpsc;

/// Recorder settings, resolved from [`Config`]
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub session_rate: u32,
    pub queue_capacity: usize,
    pub recordings_dir: PathBuf,
    pub mic_device: Option<usize>,
    pub system_device: Option<usize>,
    pub capture_system_audio: bool,
}

impl RecorderConfig {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            session_rate: config.audio.sample_rate,
            queue_capacity: config.audio.queue_capacity,
            recordings_dir: config.storage.resolve_recordings_dir()?,
            mic_device: config.audio.mic_device,
            system_device: config.audio.system_device,
            capture_system_audio: config.audio.capture_system_audio,
        })
    }
}

/// Audio source error event payload, relayed to the caller while a
/// session is active. `recording_continues` tells the caller whether
/// this is a warning (sibling source still live) or fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSourceError {
    pub source: CaptureSource,
    pub message: String,
    pub timestamp_ms: u64,
    pub recording_continues: bool,
}

/// Events pushed to the caller during a session. Sends never block;
/// the caller may ignore them entirely.
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    Started {
        meeting_id: String,
        status: RecordingStatus,
    },
    Paused,
    Resumed,
    SourceError(AudioSourceError),
    Stopped {
        outcome: RecordingOutcome,
    },
}

/// Status returned when a recording starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingStatus {
    pub audio_path: PathBuf,
    pub mic_active: bool,
    pub system_active: bool,
    pub mic_device: String,
    pub system_device: String,
}

/// Result returned when a recording stops. The session object is gone
/// by the time the caller sees this; the outcome and the file are the
/// only surviving artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingOutcome {
    pub meeting_id: String,
    pub output_path: PathBuf,
    pub duration_secs: u64,
    pub has_dual_audio: bool,
    pub mic_captured: bool,
    pub system_captured: bool,
}

/// Point-in-time recorder status for external callers
#[derive(Debug, Clone, Serialize)]
pub struct RecorderStatus {
    #[serde(flatten)]
    pub state: StateSnapshot,
    pub session_id: Option<String>,
    pub meeting_id: Option<String>,
    pub mic_device: Option<String>,
    pub system_device: Option<String>,
}

/// One capture side as seen by the writer thread
struct WriterInput {
    rx: Receiver<AudioChunk>,
    active: Arc<AtomicBool>,
}

impl WriterInput {
    fn from_channel(channel: &CaptureChannel) -> Self {
        Self {
            rx: channel.chunks(),
            active: channel.active_handle(),
        }
    }

    fn is_live(input: &Option<Self>) -> bool {
        input
            .as_ref()
            .map(|i| i.active.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

struct ActiveSession {
    /// Opaque session identifier, distinct from the caller's meeting id
    session_id: uuid::Uuid,
    meeting_id: String,
    output_path: PathBuf,
    mic: Option<CaptureChannel>,
    system: Option<CaptureChannel>,
    writer_stop: Arc<AtomicBool>,
    writer: Option<thread::JoinHandle<std::result::Result<u64, AudioError>>>,
}

/// Owns both capture channels, the writer thread, and the state machine
pub struct DualStreamRecorder {
    config: RecorderConfig,
    catalog: DeviceCatalog,
    state: Arc<Mutex<RecordingStateMachine>>,
    event_tx: mpsc::UnboundedSender<RecorderEvent>,
    session: Option<ActiveSession>,
}

impl DualStreamRecorder {
    pub fn new(config: RecorderConfig, event_tx: mpsc::UnboundedSender<RecorderEvent>) -> Self {
        Self {
            config,
            catalog: DeviceCatalog::new(),
            state: Arc::new(Mutex::new(RecordingStateMachine::new())),
            event_tx,
            session: None,
        }
    }

    /// Start a session. Device indices fall back to the configured
    /// indices, then to catalog auto-detection; a requested index that
    /// no longer exists is a warning, not a failure. System audio is
    /// optional: without it the session degrades to mic-only. Only the
    /// failure of every source makes start fail.
    pub fn start(
        &mut self,
        meeting_id: &str,
        mic_device: Option<usize>,
        system_device: Option<usize>,
    ) -> Result<RecordingStatus> {
        self.lock_state().begin()?;

        match self.open_session(meeting_id, mic_device, system_device) {
            Ok(status) => {
                self.emit(RecorderEvent::Started {
                    meeting_id: meeting_id.to_string(),
                    status: status.clone(),
                });
                tracing::info!(
                    "Recording started for {}: mic={:?} system={:?}",
                    meeting_id,
                    status.mic_device,
                    status.system_device
                );
                Ok(status)
            }
            Err(e) => {
                let _ = self.lock_state().finish();
                Err(e)
            }
        }
    }

    fn open_session(
        &mut self,
        meeting_id: &str,
        mic_device: Option<usize>,
        system_device: Option<usize>,
    ) -> Result<RecordingStatus> {
        let (auto_mic, auto_system) = self.catalog.default_devices();
        let channel_config = ChannelConfig {
            session_rate: self.config.session_rate,
            queue_capacity: self.config.queue_capacity,
        };
        let (fault_tx, fault_rx) = fault_channel();

        let mic_idx = resolve_index("mic", mic_device.or(self.config.mic_device), auto_mic);
        let mic = mic_idx.and_then(|idx| {
            open_channel(idx, CaptureSource::Mic, channel_config, fault_tx.clone())
        });

        let system_idx = if self.config.capture_system_audio {
            resolve_index(
                "system",
                system_device.or(self.config.system_device),
                auto_system,
            )
        } else {
            None
        };
        let system = system_idx.and_then(|idx| {
            open_channel(idx, CaptureSource::System, channel_config, fault_tx.clone())
        });

        if mic.is_none() && system.is_none() {
            return Err(AudioError::BothSourcesFailed.into());
        }
        if system.is_none() {
            tracing::warn!("No system audio source; recording mic only");
        }

        let output_path = self
            .config
            .recordings_dir
            .join(format!("{}.wav", meeting_id));
        let wav = StereoWavWriter::create(&output_path, self.config.session_rate)?;

        let writer_stop = Arc::new(AtomicBool::new(false));
        let writer = {
            let stop = writer_stop.clone();
            let mic_input = mic.as_ref().map(WriterInput::from_channel);
            let system_input = system.as_ref().map(WriterInput::from_channel);
            let state = self.state.clone();
            let event_tx = self.event_tx.clone();
            thread::spawn(move || {
                writer_loop(wav, stop, mic_input, system_input, fault_rx, state, event_tx)
            })
        };

        let status = RecordingStatus {
            audio_path: output_path.clone(),
            mic_active: mic.is_some(),
            system_active: system.is_some(),
            mic_device: mic
                .as_ref()
                .map(|c| c.device_name().to_string())
                .unwrap_or_else(|| "not available".to_string()),
            system_device: system
                .as_ref()
                .map(|c| c.device_name().to_string())
                .unwrap_or_else(|| "not available".to_string()),
        };

        let session_id = uuid::Uuid::new_v4();
        tracing::debug!("Session {} opened for meeting {}", session_id, meeting_id);
        self.session = Some(ActiveSession {
            session_id,
            meeting_id: meeting_id.to_string(),
            output_path,
            mic,
            system,
            writer_stop,
            writer: Some(writer),
        });

        Ok(status)
    }

    /// Pause both channels. Samples are discarded at the source; the
    /// flag takes effect at the next chunk boundary.
    pub fn pause(&mut self) -> Result<()> {
        self.lock_state().pause()?;
        if let Some(session) = &self.session {
            if let Some(mic) = &session.mic {
                mic.pause();
            }
            if let Some(system) = &session.system {
                system.pause();
            }
        }
        self.emit(RecorderEvent::Paused);
        tracing::info!("Recording paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.lock_state().resume()?;
        if let Some(session) = &self.session {
            if let Some(mic) = &session.mic {
                mic.resume();
            }
            if let Some(system) = &session.system {
                system.resume();
            }
        }
        self.emit(RecorderEvent::Resumed);
        tracing::info!("Recording resumed");
        Ok(())
    }

    /// Stop the session, finalize the file, and destroy the session.
    /// Valid from recording, paused, and error phases so a failed
    /// session still reports exactly what it captured.
    pub async fn stop(&mut self) -> Result<RecordingOutcome> {
        let timing = self.lock_state().finish()?;

        let session = self.session.take().ok_or(StateError::InvalidTransition {
            from: "idle",
            op: "stop",
        })?;
        let meeting_id = session.meeting_id.clone();

        let mic_captured = session.mic.as_ref().is_some_and(|c| c.is_active());
        let system_captured = session.system.as_ref().is_some_and(|c| c.is_active());

        let output_path = session.output_path.clone();
        let frames = close_session(session).await?;
        if frames == 0 {
            tracing::warn!("{}", AudioError::EmptyRecording);
        }

        // Frames on disk are authoritative (pauses wrote nothing); the
        // state machine's paused-time accounting is the fallback.
        let duration_secs = match wav_duration_secs(&output_path) {
            Ok(d) => d.round() as u64,
            Err(e) => {
                tracing::warn!("Could not read recording duration: {}", e);
                timing.recorded.as_secs()
            }
        };

        let outcome = RecordingOutcome {
            meeting_id,
            output_path,
            duration_secs,
            has_dual_audio: mic_captured && system_captured,
            mic_captured,
            system_captured,
        };
        self.emit(RecorderEvent::Stopped {
            outcome: outcome.clone(),
        });
        tracing::info!(
            "Recording stopped: {}s, mic_captured={}, system_captured={}",
            outcome.duration_secs,
            outcome.mic_captured,
            outcome.system_captured
        );

        Ok(outcome)
    }

    /// Abort the session and delete the partial recording, leaving no
    /// corrupt artifact behind
    pub async fn abort(&mut self) -> Result<()> {
        self.lock_state().finish()?;

        let session = self.session.take().ok_or(StateError::InvalidTransition {
            from: "idle",
            op: "abort",
        })?;
        let output_path = session.output_path.clone();
        close_session(session).await?;

        if output_path.exists() {
            std::fs::remove_file(&output_path)?;
        }
        tracing::info!("Recording aborted; partial output discarded");
        Ok(())
    }

    /// Current phase and session details for external callers
    pub fn status(&self) -> RecorderStatus {
        RecorderStatus {
            state: self.lock_state().snapshot(),
            session_id: self.session.as_ref().map(|s| s.session_id.to_string()),
            meeting_id: self.session.as_ref().map(|s| s.meeting_id.clone()),
            mic_device: self
                .session
                .as_ref()
                .and_then(|s| s.mic.as_ref())
                .map(|c| c.device_name().to_string()),
            system_device: self
                .session
                .as_ref()
                .and_then(|s| s.system.as_ref())
                .map(|c| c.device_name().to_string()),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RecordingStateMachine> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: RecorderEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Resolve a device index: requested index if it still exists, else
/// auto-detected. A stale index is a warning, not a failure.
fn resolve_index(
    label: &str,
    requested: Option<usize>,
    auto_detected: Option<usize>,
) -> Option<usize> {
    match requested {
        Some(idx) => {
            if device_by_index(idx).is_ok() {
                Some(idx)
            } else {
                tracing::warn!(
                    "Requested {} device {} no longer exists; auto-detecting",
                    label,
                    idx
                );
                auto_detected
            }
        }
        None => auto_detected,
    }
}

/// Open one capture channel, classifying any failure as non-fatal at
/// this level; the caller decides whether the session can proceed.
fn open_channel(
    index: usize,
    source: CaptureSource,
    config: ChannelConfig,
    fault_tx: crossbeam_channel::Sender<ChannelFault>,
) -> Option<CaptureChannel> {
    let device = match device_by_index(index) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!("{} device {} unavailable: {}", source, index, e);
            return None;
        }
    };
    match CaptureChannel::open(device, source, config, fault_tx) {
        Ok(channel) => Some(channel),
        Err(e) => {
            tracing::warn!("{} capture failed to open: {}", source, e);
            None
        }
    }
}

/// Close capture channels and join the writer without blocking the
/// async caller
async fn close_session(mut session: ActiveSession) -> Result<u64> {
    let frames = tokio::task::spawn_blocking(move || -> std::result::Result<u64, AudioError> {
        if let Some(mic) = &mut session.mic {
            let dropped = mic.dropped_chunks();
            if dropped > 0 {
                tracing::warn!("mic channel dropped {} chunks during session", dropped);
            }
            mic.close();
        }
        if let Some(system) = &mut session.system {
            let dropped = system.dropped_chunks();
            if dropped > 0 {
                tracing::warn!("system channel dropped {} chunks during session", dropped);
            }
            system.close();
        }

        session.writer_stop.store(true, Ordering::SeqCst);
        match session.writer.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| AudioError::StreamError("writer thread panicked".to_string()))?,
            None => Ok(0),
        }
    })
    .await
    .map_err(|e| DuoscribeError::Audio(AudioError::StreamError(e.to_string())))??;

    Ok(frames)
}

/// The writer task: the only code that touches the output file.
///
/// Each tick drains both chunk queues into the staging buffers, relays
/// any capture faults, and writes whatever frames are ready. Exits when
/// told to stop or when every source has died (after transitioning the
/// state machine to the error phase).
fn writer_loop(
    mut wav: StereoWavWriter,
    stop: Arc<AtomicBool>,
    mic: Option<WriterInput>,
    system: Option<WriterInput>,
    fault_rx: Receiver<ChannelFault>,
    state: Arc<Mutex<RecordingStateMachine>>,
    event_tx: mpsc::UnboundedSender<RecorderEvent>,
) -> std::result::Result<u64, AudioError> {
    loop {
        let stopping = stop.load(Ordering::SeqCst);

        if let Some(input) = &mic {
            for chunk in input.rx.try_iter() {
                wav.stage_left(&chunk.samples);
            }
        }
        if let Some(input) = &system {
            for chunk in input.rx.try_iter() {
                wav.stage_right(&chunk.samples);
            }
        }

        let mut mic_live = WriterInput::is_live(&mic);
        let mut system_live = WriterInput::is_live(&system);

        while let Ok(fault) = fault_rx.try_recv() {
            mic_live = WriterInput::is_live(&mic);
            system_live = WriterInput::is_live(&system);
            let recording_continues = mic_live || system_live;
            // classify the raw driver error at this boundary
            let classified = if recording_continues {
                AudioError::ChannelCaptureFailed {
                    channel: fault.source.as_str(),
                    message: fault.message.clone(),
                }
            } else {
                AudioError::BothSourcesFailed
            };
            tracing::error!("{}; recording_continues={}", classified, recording_continues);
            let _ = event_tx.send(RecorderEvent::SourceError(AudioSourceError {
                source: fault.source,
                message: fault.message,
                timestamp_ms: chrono::Utc::now().timestamp_millis() as u64,
                recording_continues,
            }));
            if !recording_continues {
                let _ = state.lock().unwrap_or_else(|e| e.into_inner()).fail();
            }
        }

        wav.write_ready(mic_live, system_live)?;

        if stopping {
            break;
        }
        if !mic_live && !system_live {
            tracing::error!("All audio sources lost; finalizing recording");
            break;
        }

        thread::sleep(std::time::Duration::from_millis(10));
    }

    wav.drain_all()?;
    wav.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::time::Duration;

    fn spawn_writer(
        path: &std::path::Path,
        mic: Option<WriterInput>,
        system: Option<WriterInput>,
        fault_rx: Receiver<ChannelFault>,
        state: Arc<Mutex<RecordingStateMachine>>,
        event_tx: mpsc::UnboundedSender<RecorderEvent>,
    ) -> (
        Arc<AtomicBool>,
        thread::JoinHandle<std::result::Result<u64, AudioError>>,
    ) {
        let wav = StereoWavWriter::create(path, 16000).unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();
        let handle = thread::spawn(move || {
            writer_loop(wav, stop_clone, mic, system, fault_rx, state, event_tx)
        });
        (stop, handle)
    }

    fn input(capacity: usize) -> (crossbeam_channel::Sender<AudioChunk>, WriterInput, Arc<AtomicBool>) {
        let (tx, rx) = bounded(capacity);
        let active = Arc::new(AtomicBool::new(true));
        (
            tx,
            WriterInput {
                rx,
                active: active.clone(),
            },
            active,
        )
    }

    fn chunk(source: CaptureSource, seq: u64, samples: Vec<f32>) -> AudioChunk {
        AudioChunk {
            source,
            seq,
            samples,
        }
    }

    fn started_state() -> Arc<Mutex<RecordingStateMachine>> {
        let mut sm = RecordingStateMachine::new();
        sm.begin().unwrap();
        Arc::new(Mutex::new(sm))
    }

    #[test]
    fn test_writer_interleaves_both_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let (mic_tx, mic_input, _) = input(16);
        let (sys_tx, sys_input, _) = input(16);
        let (_fault_tx, fault_rx) = fault_channel();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();

        let (stop, handle) = spawn_writer(
            &path,
            Some(mic_input),
            Some(sys_input),
            fault_rx,
            started_state(),
            event_tx,
        );

        mic_tx
            .send(chunk(CaptureSource::Mic, 1, vec![0.5; 1600]))
            .unwrap();
        sys_tx
            .send(chunk(CaptureSource::System, 1, vec![-0.5; 1600]))
            .unwrap();
        thread::sleep(Duration::from_millis(80));
        stop.store(true, Ordering::SeqCst);
        let frames = handle.join().unwrap().unwrap();
        assert_eq!(frames, 1600);

        let wav = super::super::wav::read_wav_channels(&path).unwrap();
        assert_eq!(wav.channel_count(), 2);
        assert!(wav.channels[0].iter().all(|&s| s > 0.4));
        assert!(wav.channels[1].iter().all(|&s| s < -0.4));
    }

    #[test]
    fn test_single_source_fault_continues_with_silence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let (mic_tx, mic_input, mic_active) = input(16);
        let (sys_tx, sys_input, _) = input(16);
        let (fault_tx, fault_rx) = fault_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let state = started_state();

        let (stop, handle) = spawn_writer(
            &path,
            Some(mic_input),
            Some(sys_input),
            fault_rx,
            state.clone(),
            event_tx,
        );

        mic_tx
            .send(chunk(CaptureSource::Mic, 1, vec![0.5; 800]))
            .unwrap();
        sys_tx
            .send(chunk(CaptureSource::System, 1, vec![0.5; 800]))
            .unwrap();
        thread::sleep(Duration::from_millis(50));

        // mic dies mid-session
        mic_active.store(false, Ordering::SeqCst);
        fault_tx
            .send(ChannelFault {
                source: CaptureSource::Mic,
                message: "device disconnected".to_string(),
            })
            .unwrap();
        sys_tx
            .send(chunk(CaptureSource::System, 2, vec![0.5; 800]))
            .unwrap();
        thread::sleep(Duration::from_millis(50));

        stop.store(true, Ordering::SeqCst);
        handle.join().unwrap().unwrap();

        // warning event, recording continues, session never errored
        let event = event_rx.try_recv().unwrap();
        match event {
            RecorderEvent::SourceError(err) => {
                assert_eq!(err.source, CaptureSource::Mic);
                assert!(err.recording_continues);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(!state.lock().unwrap().is_error());

        let wav = super::super::wav::read_wav_channels(&path).unwrap();
        assert_eq!(wav.channel_count(), 2);
        // mic channel is silence-filled after the failure
        let tail = &wav.channels[0][800..];
        assert!(tail.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_both_sources_failing_errors_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let (_mic_tx, mic_input, mic_active) = input(16);
        let (_sys_tx, sys_input, sys_active) = input(16);
        let (fault_tx, fault_rx) = fault_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let state = started_state();

        let (_stop, handle) = spawn_writer(
            &path,
            Some(mic_input),
            Some(sys_input),
            fault_rx,
            state.clone(),
            event_tx,
        );

        mic_active.store(false, Ordering::SeqCst);
        fault_tx
            .send(ChannelFault {
                source: CaptureSource::Mic,
                message: "gone".to_string(),
            })
            .unwrap();
        sys_active.store(false, Ordering::SeqCst);
        fault_tx
            .send(ChannelFault {
                source: CaptureSource::System,
                message: "gone too".to_string(),
            })
            .unwrap();

        // writer notices on its own and exits without a stop signal
        handle.join().unwrap().unwrap();
        assert!(state.lock().unwrap().is_error());

        let mut saw_fatal = false;
        while let Ok(event) = event_rx.try_recv() {
            if let RecorderEvent::SourceError(err) = event {
                if !err.recording_continues {
                    saw_fatal = true;
                }
            }
        }
        assert!(saw_fatal);
        // the partial file was still finalized, not corrupted
        assert!(wav_duration_secs(&path).is_ok());
    }

    #[test]
    fn test_mic_only_session_fills_system_with_silence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let (mic_tx, mic_input, _) = input(16);
        let (_fault_tx, fault_rx) = fault_channel();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();

        let (stop, handle) = spawn_writer(
            &path,
            Some(mic_input),
            None,
            fault_rx,
            started_state(),
            event_tx,
        );

        mic_tx
            .send(chunk(CaptureSource::Mic, 1, vec![0.5; 1600]))
            .unwrap();
        thread::sleep(Duration::from_millis(80));
        stop.store(true, Ordering::SeqCst);
        let frames = handle.join().unwrap().unwrap();
        assert_eq!(frames, 1600);

        let wav = super::super::wav::read_wav_channels(&path).unwrap();
        assert_eq!(wav.channel_count(), 2);
        assert!(wav.channels[1].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_clock_skew_is_absorbed_by_staging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let (mic_tx, mic_input, _) = input(64);
        let (sys_tx, sys_input, _) = input(64);
        let (_fault_tx, fault_rx) = fault_channel();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();

        let (stop, handle) = spawn_writer(
            &path,
            Some(mic_input),
            Some(sys_input),
            fault_rx,
            started_state(),
            event_tx,
        );

        // mic runs 0.1% fast relative to the system clock
        for i in 0..20u64 {
            mic_tx
                .send(chunk(CaptureSource::Mic, i + 1, vec![0.3; 1001]))
                .unwrap();
            sys_tx
                .send(chunk(CaptureSource::System, i + 1, vec![0.3; 1000]))
                .unwrap();
            thread::sleep(Duration::from_millis(5));
        }
        thread::sleep(Duration::from_millis(60));
        stop.store(true, Ordering::SeqCst);
        let frames = handle.join().unwrap().unwrap();

        // all samples land in the file; the 20-sample skew is drained
        // at the end rather than misaligning earlier frames
        assert_eq!(frames, 20 * 1001);
        handle_skew_assertions(&path);
    }

    fn handle_skew_assertions(path: &std::path::Path) {
        let wav = super::super::wav::read_wav_channels(path).unwrap();
        assert_eq!(wav.channels[0].len(), wav.channels[1].len());
    }
}
