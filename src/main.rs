//! Duoscribe - dual-source meeting recorder and transcriber
//!
//! `duoscribe record` captures mic + system audio into a stereo WAV;
//! `duoscribe transcribe <file>` turns a recording into a
//! speaker-attributed transcript.

use clap::Parser;
use duoscribe::audio::{
    DeviceCatalog, DeviceRole, DualStreamRecorder, RecorderConfig, RecorderEvent,
};
use duoscribe::cli::{Cli, Commands};
use duoscribe::config::Config;
use duoscribe::transcript::{
    parse_stored, RecordingHints, StoredTranscript, TranscriptionOrchestrator,
    TranscriptionOutcome,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("duoscribe={},warn", log_level))),
        )
        .with_target(false)
        .init();

    let mut config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(model) = cli.model {
        config.whisper.model = model;
    }

    match cli.command {
        Commands::Devices { role } => cmd_devices(role.as_deref())?,
        Commands::Record {
            meeting_id,
            mic_device,
            system_device,
            no_system_audio,
            max_duration,
            transcribe,
        } => {
            if no_system_audio {
                config.audio.capture_system_audio = false;
            }
            cmd_record(
                &config,
                meeting_id,
                mic_device,
                system_device,
                max_duration,
                transcribe,
            )
            .await?;
        }
        Commands::Transcribe {
            file,
            no_mic,
            no_system,
        } => cmd_transcribe(&config, &file, no_mic, no_system)?,
        Commands::Show { file } => cmd_show(&file)?,
        Commands::Config => {
            let path = Config::ensure_default_config()?;
            println!("# {}", path.display());
            println!(
                "# whisper model available: {}",
                duoscribe::transcribe::model_available(&config.whisper)
            );
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn cmd_devices(role: Option<&str>) -> anyhow::Result<()> {
    let role_filter = match role {
        Some("mic") => Some(DeviceRole::Microphone),
        Some("monitor") => Some(DeviceRole::Monitor),
        Some(other) => anyhow::bail!("Unknown role {:?} (expected \"mic\" or \"monitor\")", other),
        None => None,
    };

    let devices = DeviceCatalog::new().list(role_filter)?;
    if devices.is_empty() {
        println!("No audio input devices found.");
        return Ok(());
    }
    for device in devices {
        let role = match device.role {
            DeviceRole::Microphone => "mic",
            DeviceRole::Monitor => "monitor",
        };
        println!("{:3}  [{}]  {}", device.index, role, device.name);
    }
    Ok(())
}

async fn cmd_record(
    config: &Config,
    meeting_id: Option<String>,
    mic_device: Option<usize>,
    system_device: Option<usize>,
    max_duration: Option<u64>,
    transcribe_after: bool,
) -> anyhow::Result<()> {
    let meeting_id = meeting_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut recorder = DualStreamRecorder::new(RecorderConfig::from_config(config)?, event_tx);

    // Surface source errors while recording; the caller here just warns
    let events = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if let RecorderEvent::SourceError(err) = event {
                if err.recording_continues {
                    eprintln!("warning: {} source failed: {}", err.source, err.message);
                } else {
                    eprintln!("error: all audio sources lost");
                }
            }
        }
    });

    let status = recorder.start(&meeting_id, mic_device, system_device)?;
    println!("Recording meeting {}", meeting_id);
    println!("  mic:    {}", status.mic_device);
    println!("  system: {}", status.system_device);
    println!("Press Ctrl+C to stop.");

    match max_duration {
        Some(secs) => {
            let limit = tokio::time::sleep(std::time::Duration::from_secs(secs));
            tokio::select! {
                _ = limit => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
        }
    }

    let outcome = recorder.stop().await?;
    events.abort();

    println!(
        "Saved {} ({}s, mic_captured={}, system_captured={})",
        outcome.output_path.display(),
        outcome.duration_secs,
        outcome.mic_captured,
        outcome.system_captured
    );

    if transcribe_after {
        let hints = RecordingHints {
            mic_device: status.mic_device,
            system_device: status.system_device,
            mic_captured: outcome.mic_captured,
            system_captured: outcome.system_captured,
        };
        run_transcription(config, &outcome.output_path, &hints)?;
    }

    Ok(())
}

fn cmd_transcribe(
    config: &Config,
    file: &std::path::Path,
    no_mic: bool,
    no_system: bool,
) -> anyhow::Result<()> {
    let hints = RecordingHints {
        mic_captured: !no_mic,
        system_captured: !no_system,
        ..RecordingHints::default()
    };
    run_transcription(config, file, &hints)
}

fn run_transcription(
    config: &Config,
    file: &std::path::Path,
    hints: &RecordingHints,
) -> anyhow::Result<()> {
    let orchestrator = TranscriptionOrchestrator::from_config(config)?;
    match orchestrator.transcribe_recording(file, hints)? {
        TranscriptionOutcome::Dual(transcript) => {
            println!("{}", transcript.render());
            // the persisted form, for piping into external storage
            tracing::debug!("stored form: {}", transcript.to_stored_string()?);
        }
        TranscriptionOutcome::Mono(mono) => {
            println!("{}", mono.to_legacy_text());
        }
    }
    Ok(())
}

fn cmd_show(file: &std::path::Path) -> anyhow::Result<()> {
    let value = std::fs::read_to_string(file)?;
    match parse_stored(&value)? {
        StoredTranscript::Structured(transcript) => {
            if !transcript.has_dual_audio {
                println!("(single-source recording)");
            }
            println!("{}", transcript.render());
        }
        StoredTranscript::Legacy(text) => {
            println!("{}", text);
        }
    }
    Ok(())
}
