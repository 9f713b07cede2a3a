//! Recording session use case
//!
//! Orchestrates one capture stream fanning out into per-target encoder
//! sinks. All state lives behind a single mutex; the capture callback
//! touches only the fanout, never the session.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Local;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::audio::{ChannelMap, ChannelRouter, InvalidChannelMap, SampleBlock};
use crate::domain::config::Settings;
use crate::domain::error::ConfigError;
use crate::domain::fs;
use crate::domain::output::{OutputSpec, OutputTarget, RecordingArtifact};
use crate::domain::session::{InvalidStateTransition, SessionMachine, SessionState};

use super::ports::{
    CaptureGate, DeviceError, DeviceStream, EncoderSink, GateGuard, SinkError, SinkFactory,
    StreamHandle, StreamRequest,
};

/// Errors from the recording session use case
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("A recording is already in progress ({0})")]
    SessionBusy(#[from] InvalidStateTransition),

    #[error(transparent)]
    Channels(#[from] InvalidChannelMap),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("No output targets are enabled")]
    NoOutputsEnabled,

    #[error("Failed to prepare output directory: {0}")]
    OutputDir(String),

    #[error("Capture stream died mid-recording; finalized what was captured")]
    DeviceFault,
}

/// Immutable snapshot a session records under. Built from settings at
/// start; later settings edits never affect a running session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub channel_map: ChannelMap,
    pub recordings_dir: PathBuf,
    pub specs: Vec<OutputSpec>,
    pub block_frames: usize,
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, SessionError> {
        Ok(Self {
            channel_map: settings.channel_map()?,
            recordings_dir: settings.recordings_dir(),
            specs: settings.output_specs()?,
            block_frames: crate::domain::audio::DEFAULT_BLOCK_FRAMES,
        })
    }

    fn enabled_specs(&self) -> impl Iterator<Item = &OutputSpec> {
        self.specs.iter().filter(|s| s.enabled)
    }
}

/// Session lifecycle notifications for the UI boundary.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionState),
    TargetSkipped { target: OutputTarget, reason: String },
    TargetFinished { target: OutputTarget, path: PathBuf },
    TargetFailed { target: OutputTarget, reason: String },
}

pub type SessionObserver = Arc<dyn Fn(SessionEvent) + Send + Sync>;

/// Shared between the session and the capture callback. Routes every
/// incoming block and feeds each sink its target's projection.
struct Fanout {
    router: ChannelRouter,
    sinks: Mutex<Vec<Box<dyn EncoderSink>>>,
}

impl Fanout {
    fn dispatch(&self, block: &SampleBlock) {
        let mut sinks = match self.sinks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for sink in sinks.iter_mut() {
            let routed = self.router.route(sink.target(), block);
            if let Err(e) = sink.push(&routed) {
                warn!(target = %sink.target(), error = %e, "sink rejected block");
            }
        }
    }

    fn take_sinks(&self) -> Vec<Box<dyn EncoderSink>> {
        let mut sinks = match self.sinks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *sinks)
    }
}

struct ActiveRecording {
    handle: Box<dyn StreamHandle>,
    fanout: Arc<Fanout>,
    config: SessionConfig,
    started_at: Instant,
    skipped: Vec<(OutputTarget, String)>,
    _gate: Option<GateGuard>,
}

struct Inner {
    machine: SessionMachine,
    active: Option<ActiveRecording>,
}

/// Recording session use case
pub struct RecordingSession<D, F>
where
    D: DeviceStream,
    F: SinkFactory,
{
    device: D,
    sink_factory: F,
    gate: CaptureGate,
    observer: Option<SessionObserver>,
    inner: Mutex<Inner>,
}

impl<D, F> RecordingSession<D, F>
where
    D: DeviceStream,
    F: SinkFactory,
{
    pub fn new(device: D, sink_factory: F, gate: CaptureGate) -> Self {
        Self {
            device,
            sink_factory,
            gate,
            observer: None,
            inner: Mutex::new(Inner {
                machine: SessionMachine::new(),
                active: None,
            }),
        }
    }

    /// Attach a lifecycle observer. Must be called before `start`.
    pub fn with_observer(mut self, observer: SessionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(observer) = &self.observer {
            observer(event);
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock_inner().machine.state()
    }

    pub fn is_recording(&self) -> bool {
        self.lock_inner().machine.is_recording()
    }

    /// Seconds elapsed since the stream opened, 0 when idle.
    pub fn elapsed_secs(&self) -> u64 {
        self.lock_inner()
            .active
            .as_ref()
            .map_or(0, |a| a.started_at.elapsed().as_secs())
    }

    /// ERROR -> IDLE, at the operator's request.
    pub fn reset(&self) -> Result<(), SessionError> {
        let mut inner = self.lock_inner();
        inner.machine.reset()?;
        inner.active = None;
        self.emit(SessionEvent::StateChanged(SessionState::Idle));
        Ok(())
    }

    /// Start recording under `config`.
    ///
    /// Validation failures leave the session idle with nothing acquired.
    /// Failures after resources were acquired move it to the error state
    /// with all opened sinks aborted and their temp files deleted.
    pub fn start(&self, config: SessionConfig) -> Result<(), SessionError> {
        let mut inner = self.lock_inner();
        inner.machine.begin_start()?;
        self.emit(SessionEvent::StateChanged(SessionState::Starting));

        match self.try_start(config) {
            Ok(active) => {
                // begin_start succeeded, so mark_recording cannot fail
                let _ = inner.machine.mark_recording();
                for (target, reason) in &active.skipped {
                    self.emit(SessionEvent::TargetSkipped {
                        target: *target,
                        reason: reason.clone(),
                    });
                }
                inner.active = Some(active);
                self.emit(SessionEvent::StateChanged(SessionState::Recording));
                info!("recording started");
                Ok(())
            }
            Err(StartFailure::Rejected(e)) => {
                let _ = inner.machine.abort_start();
                self.emit(SessionEvent::StateChanged(SessionState::Idle));
                Err(e)
            }
            Err(StartFailure::Faulted(e)) => {
                inner.machine.fail();
                self.emit(SessionEvent::StateChanged(SessionState::Error));
                Err(e)
            }
        }
    }

    /// Stop recording, finalize every sink, and emit the artifact.
    ///
    /// A second stop, or a stop while idle, fails with the state error.
    pub fn stop(&self) -> Result<RecordingArtifact, SessionError> {
        let mut inner = self.lock_inner();
        inner.machine.begin_stop()?;
        self.emit(SessionEvent::StateChanged(SessionState::Stopping));

        // begin_stop only succeeds while recording, so active is present
        let Some(mut active) = inner.active.take() else {
            inner.machine.fail();
            return Err(SessionError::DeviceFault);
        };

        let faulted = !active.handle.is_alive();
        active.handle.close();
        let hardware_underruns = active.handle.underruns();
        let duration = active.started_at.elapsed();
        let end_time = Local::now();

        let mut artifact = RecordingArtifact {
            duration,
            skipped: active.skipped.clone(),
            ..Default::default()
        };
        artifact.underruns = hardware_underruns;

        for sink in active.fanout.take_sinks() {
            let target = sink.target();
            let spec = active
                .config
                .specs
                .iter()
                .find(|s| s.target == target)
                .cloned();
            let Some(spec) = spec else { continue };

            artifact.underruns += sink.dropped_blocks();
            let final_path = fs::final_recording_path(
                &active.config.recordings_dir,
                &spec.base_filename,
                spec.format.extension(),
                end_time,
            );
            // Failures leave the temp file in place for manual recovery
            match sink.finish(&final_path) {
                Ok(output) => {
                    debug!(target = %target, path = %output.path.display(), "sink finalized");
                    self.emit(SessionEvent::TargetFinished {
                        target,
                        path: output.path.clone(),
                    });
                    artifact.outputs.push(output);
                }
                Err(e) => {
                    warn!(target = %target, error = %e, "sink finalization failed");
                    self.emit(SessionEvent::TargetFailed {
                        target,
                        reason: e.to_string(),
                    });
                    artifact.skipped.push((target, e.to_string()));
                }
            }
        }

        if faulted {
            inner.machine.fail();
            self.emit(SessionEvent::StateChanged(SessionState::Error));
            return Err(SessionError::DeviceFault);
        }

        // begin_stop succeeded, so complete_stop cannot fail
        let _ = inner.machine.complete_stop();
        self.emit(SessionEvent::StateChanged(SessionState::Idle));
        info!(
            duration_secs = duration.as_secs(),
            outputs = artifact.outputs.len(),
            underruns = artifact.underruns,
            "recording stopped"
        );
        Ok(artifact)
    }

    fn try_start(&self, config: SessionConfig) -> Result<ActiveRecording, StartFailure> {
        if config.enabled_specs().next().is_none() {
            return Err(StartFailure::Rejected(SessionError::NoOutputsEnabled));
        }

        // Everything here is validation; nothing is acquired yet
        let descriptor = self
            .device
            .descriptor()
            .map_err(|e| StartFailure::Rejected(e.into()))?;
        let router = ChannelRouter::new(config.channel_map.clone(), &descriptor)
            .map_err(|e| StartFailure::Rejected(e.into()))?;
        let sample_rate = config
            .enabled_specs()
            .map(|s| s.format.sample_rate())
            .next()
            .unwrap_or(descriptor.default_sample_rate);
        if !descriptor.supports_sample_rate(sample_rate) {
            return Err(StartFailure::Rejected(
                DeviceError::FormatUnsupported {
                    device: descriptor.name.clone(),
                    sample_rate,
                    channels: descriptor.max_input_channels,
                }
                .into(),
            ));
        }

        let gate = if self.device.supports_shared_access() {
            None
        } else {
            Some(
                self.gate
                    .acquire()
                    .map_err(|e| StartFailure::Rejected(e.into()))?,
            )
        };

        std::fs::create_dir_all(&config.recordings_dir)
            .map_err(|e| StartFailure::Rejected(SessionError::OutputDir(e.to_string())))?;

        // From here on resources accumulate; failure aborts them all
        let mut sinks: Vec<Box<dyn EncoderSink>> = Vec::new();
        let mut skipped = Vec::new();
        for spec in config.enabled_specs() {
            let channels = router.output_channels(spec.target);
            match self
                .sink_factory
                .open(spec, &config.recordings_dir, channels, sample_rate)
            {
                Ok(sink) => sinks.push(sink),
                Err(SinkError::EncoderUnavailable { tool }) => {
                    warn!(target = %spec.target, tool, "encoder unavailable, skipping target");
                    skipped.push((
                        spec.target,
                        SinkError::EncoderUnavailable { tool }.to_string(),
                    ));
                }
                Err(e) => {
                    for sink in sinks {
                        sink.abort();
                    }
                    return Err(StartFailure::Faulted(e.into()));
                }
            }
        }
        if sinks.is_empty() {
            return Err(StartFailure::Rejected(SessionError::NoOutputsEnabled));
        }

        let fanout = Arc::new(Fanout {
            router,
            sinks: Mutex::new(sinks),
        });
        let callback_fanout = Arc::clone(&fanout);
        let request = StreamRequest {
            sample_rate,
            channel_count: descriptor.max_input_channels,
            block_frames: config.block_frames,
        };
        let handle = match self.device.open(
            request,
            Box::new(move |block| callback_fanout.dispatch(&block)),
        ) {
            Ok(handle) => handle,
            Err(e) => {
                for sink in fanout.take_sinks() {
                    sink.abort();
                }
                return Err(StartFailure::Faulted(e.into()));
            }
        };

        Ok(ActiveRecording {
            handle,
            fanout,
            config,
            started_at: Instant::now(),
            skipped,
            _gate: gate,
        })
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Distinguishes start failures that acquired nothing from those that
/// must leave the session in the error state.
enum StartFailure {
    Rejected(SessionError),
    Faulted(SessionError),
}
