//! Main app runners for the talktally subcommands

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::application::ports::{CaptureGate, SettingsStore};
use crate::application::{
    list_recordings, DictationConfig, DictationController, RecordingSession, SessionConfig,
    SessionEvent, TranscribeRecordingInput, TranscribeRecordingUseCase,
};
use crate::domain::config::Settings;
use crate::domain::encoding::human_readable_bytes;
use crate::domain::DictationState;
use crate::infrastructure::{
    ClipboardPaster, CpalDeviceStream, CpalMicCapture, StdSinkFactory, WhisperCliTranscriber,
    XdgSettingsStore,
};

use super::presenter::Presenter;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Load settings merged as defaults < file < CLI overrides
pub async fn load_merged_settings(cli_overrides: Settings) -> Settings {
    let store = XdgSettingsStore::new();
    let file_settings = store.load().await.unwrap_or_else(|_| Settings::empty());

    Settings::defaults().merge(file_settings).merge(cli_overrides)
}

/// List available input devices
pub async fn run_devices() -> ExitCode {
    let presenter = Presenter::new();

    let devices = match CpalDeviceStream::list_input_devices() {
        Ok(devices) => devices,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if devices.is_empty() {
        presenter.warn("No input devices found");
        return ExitCode::from(EXIT_SUCCESS);
    }

    for device in devices {
        let rates = device
            .supported_sample_rates
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        presenter.key_value(
            &device.name,
            &format!(
                "{} in, default {} Hz (supports {})",
                device.max_input_channels, device.default_sample_rate, rates
            ),
        );
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Estimated disk usage per minute across the enabled outputs
fn estimate_bytes_per_minute(settings: &Settings) -> Option<u64> {
    let format = settings.encode_format().ok()?;
    let map = settings.channel_map().ok()?;
    let specs = settings.output_specs().ok()?;

    let total = specs
        .iter()
        .filter(|spec| spec.enabled)
        .map(|spec| {
            let channels = match spec.target {
                crate::domain::OutputTarget::Mic => 1,
                crate::domain::OutputTarget::System => map.system.len() as u16,
                crate::domain::OutputTarget::Mixed => 2,
            };
            format.bytes_per_minute(channels)
        })
        .sum();
    Some(total)
}

/// Record until Ctrl+C (or the optional duration elapses)
pub async fn run_record(settings: Settings, duration_secs: Option<u64>) -> ExitCode {
    let mut presenter = Presenter::new();

    let config = match SessionConfig::from_settings(&settings) {
        Ok(config) => config,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    if let Some(estimate) = estimate_bytes_per_minute(&settings) {
        presenter.info(&format!(
            "Estimated disk usage: {}/minute",
            human_readable_bytes(estimate)
        ));
    }

    let device = CpalDeviceStream::new(settings.device_name_or_default());
    let observer = Arc::new(|event: SessionEvent| match event {
        SessionEvent::TargetSkipped { target, reason } => {
            eprintln!("⚠ Skipping {} output: {}", target, reason);
        }
        SessionEvent::TargetFailed { target, reason } => {
            eprintln!("✗ Output {} failed: {}", target, reason);
        }
        _ => {}
    });
    let session = RecordingSession::new(device, StdSinkFactory::default(), CaptureGate::new())
        .with_observer(observer);

    if let Err(e) = session.start(config) {
        presenter.error(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }

    presenter.start_spinner("Recording... 00:00");
    presenter.info("Press Ctrl+C to stop");

    let deadline = duration_secs.map(Duration::from_secs);
    let start = std::time::Instant::now();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                presenter.update_recording_progress(session.elapsed_secs());
                if let Some(limit) = deadline {
                    if start.elapsed() >= limit {
                        break;
                    }
                }
            }
        }
    }

    presenter.update_spinner("Finalizing...");
    match session.stop() {
        Ok(artifact) => {
            presenter.spinner_success(&format!(
                "Recorded {}",
                presenter.format_elapsed(artifact.duration.as_secs())
            ));
            for output in &artifact.outputs {
                presenter.success(&format!(
                    "{}: {} ({})",
                    output.target,
                    output.path.display(),
                    human_readable_bytes(output.bytes)
                ));
            }
            for (target, reason) in &artifact.skipped {
                presenter.warn(&format!("{} skipped: {}", target, reason));
            }
            if artifact.underruns > 0 {
                presenter.warn(&format!(
                    "{} blocks lost to underruns or queue overflow",
                    artifact.underruns
                ));
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.spinner_fail(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Push-to-talk dictation driven from stdin. An empty line toggles the
/// hold edge: first Enter presses, next Enter releases.
pub async fn run_dictate(settings: Settings) -> ExitCode {
    let presenter = Presenter::new();

    if !settings.dictation_enabled() {
        presenter.warn("dictation_enable is off in settings; running anyway");
    }

    let capture = CpalMicCapture::new(settings.device_name_or_default());
    let transcriber = WhisperCliTranscriber::new(settings.dictation_command_or_default());
    let paster = ClipboardPaster::new();
    let controller = DictationController::new(
        capture,
        transcriber,
        paster,
        CaptureGate::new(),
        DictationConfig::from_settings(&settings),
    );

    presenter.info("Press Enter to start capturing, Enter again to transcribe. Ctrl+D quits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    presenter.error(&format!("stdin read failed: {}", e));
                    return ExitCode::from(EXIT_ERROR);
                }
            },
        };

        if line.trim() == "q" {
            break;
        }

        match controller.state().await {
            DictationState::Idle => {
                if let Err(e) = controller.hold_down().await {
                    presenter.error(&e.to_string());
                    continue;
                }
                presenter.info("Capturing... press Enter to finish");
            }
            _ => match controller.hold_up().await {
                Ok(Some(text)) => {
                    presenter.success("Pasted transcript");
                    presenter.output(&text);
                }
                Ok(None) => {}
                Err(e) => presenter.error(&e.to_string()),
            },
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Transcribe a recorded file (newest recording when no file is given)
pub async fn run_transcribe(
    settings: Settings,
    file: Option<String>,
    model: Option<String>,
    overwrite: bool,
    list: bool,
) -> ExitCode {
    let presenter = Presenter::new();
    let recordings_dir = settings.recordings_dir();

    if list {
        let recordings = list_recordings(&recordings_dir);
        if recordings.is_empty() {
            presenter.warn(&format!(
                "No recordings found in {}",
                recordings_dir.display()
            ));
        }
        for path in recordings {
            presenter.output(&path.to_string_lossy());
        }
        return ExitCode::from(EXIT_SUCCESS);
    }

    let source = match file {
        Some(file) => std::path::PathBuf::from(file),
        None => match list_recordings(&recordings_dir).into_iter().next() {
            Some(path) => path,
            None => {
                presenter.error(&format!(
                    "No recordings found in {}",
                    recordings_dir.display()
                ));
                return ExitCode::from(EXIT_ERROR);
            }
        },
    };

    let model = model.unwrap_or_else(|| settings.dictation_model_or_default().to_string());
    let use_case = TranscribeRecordingUseCase::new(WhisperCliTranscriber::new(
        settings.dictation_command_or_default(),
    ));

    presenter.info(&format!("Transcribing {}", source.display()));
    let input = TranscribeRecordingInput {
        source,
        model,
        transcripts_dir: settings.transcripts_dir(),
        overwrite,
    };

    match use_case.execute(input).await {
        Ok(output) => {
            presenter.success(&format!("Transcript: {}", output.transcript_path.display()));
            presenter.output(&output.transcript);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}
