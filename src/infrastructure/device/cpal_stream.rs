//! Multi-channel capture device backed by cpal
//!
//! The cpal stream is not Send, so a dedicated thread owns it for the
//! life of the capture; the handle talks to that thread through atomics.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use tracing::{debug, warn};

use crate::application::ports::{
    BlockHandler, DeviceError, DeviceStream, StreamHandle, StreamRequest,
};
use crate::domain::audio::{DeviceDescriptor, SampleBlock};

/// Rates probed against the device's supported config ranges.
const PROBE_RATES: &[u32] = &[8_000, 16_000, 22_050, 32_000, 44_100, 48_000, 88_200, 96_000];

/// Capture device adapter. An empty name selects the host default
/// input device.
pub struct CpalDeviceStream {
    device_name: String,
}

impl CpalDeviceStream {
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
        }
    }

    /// Enumerate all input devices on the default host.
    pub fn list_input_devices() -> Result<Vec<DeviceDescriptor>, DeviceError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| DeviceError::StreamFailed(e.to_string()))?;
        Ok(devices.filter_map(|d| describe(&d).ok()).collect())
    }

    fn find_device(&self) -> Result<cpal::Device, DeviceError> {
        let host = cpal::default_host();
        if self.device_name.is_empty() {
            return host
                .default_input_device()
                .ok_or_else(|| DeviceError::DeviceUnavailable("default input".into()));
        }
        let mut devices = host
            .input_devices()
            .map_err(|e| DeviceError::StreamFailed(e.to_string()))?;
        devices
            .find(|d| d.name().map(|n| n == self.device_name).unwrap_or(false))
            .ok_or_else(|| DeviceError::DeviceUnavailable(self.device_name.clone()))
    }
}

fn describe(device: &cpal::Device) -> Result<DeviceDescriptor, DeviceError> {
    let name = device
        .name()
        .map_err(|e| DeviceError::StreamFailed(e.to_string()))?;
    let default = device.default_input_config().map_err(|e| {
        warn!(device = %name, error = %e, "device probe failed");
        DeviceError::DeviceUnavailable(name.clone())
    })?;
    let configs: Vec<_> = device
        .supported_input_configs()
        .map_err(|e| DeviceError::StreamFailed(e.to_string()))?
        .collect();

    let max_input_channels = configs
        .iter()
        .map(|c| c.channels())
        .max()
        .unwrap_or(default.channels());
    let supported_sample_rates = PROBE_RATES
        .iter()
        .copied()
        .filter(|&rate| {
            configs
                .iter()
                .any(|c| c.min_sample_rate().0 <= rate && rate <= c.max_sample_rate().0)
        })
        .collect();

    Ok(DeviceDescriptor {
        name,
        max_input_channels,
        default_sample_rate: default.sample_rate().0,
        supported_sample_rates,
    })
}

impl DeviceStream for CpalDeviceStream {
    fn descriptor(&self) -> Result<DeviceDescriptor, DeviceError> {
        describe(&self.find_device()?)
    }

    fn open(
        &self,
        request: StreamRequest,
        handler: BlockHandler,
    ) -> Result<Box<dyn StreamHandle>, DeviceError> {
        let device = self.find_device()?;
        let descriptor = describe(&device)?;
        if !descriptor.supports_sample_rate(request.sample_rate)
            || request.channel_count > descriptor.max_input_channels
        {
            return Err(DeviceError::FormatUnsupported {
                device: descriptor.name,
                sample_rate: request.sample_rate,
                channels: request.channel_count,
            });
        }

        let stop = Arc::new(AtomicBool::new(false));
        let underruns = Arc::new(AtomicU64::new(0));
        let alive = Arc::new(AtomicBool::new(true));

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), DeviceError>>();
        let thread_stop = Arc::clone(&stop);
        let thread_underruns = Arc::clone(&underruns);
        let thread_alive = Arc::clone(&alive);

        let thread = std::thread::spawn(move || {
            run_capture(
                device,
                request,
                handler,
                thread_stop,
                thread_underruns,
                Arc::clone(&thread_alive),
                ready_tx,
            );
            thread_alive.store(false, Ordering::SeqCst);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(DeviceError::StreamFailed(
                    "capture thread exited before the stream opened".into(),
                ));
            }
        }

        debug!(
            sample_rate = request.sample_rate,
            channels = request.channel_count,
            block_frames = request.block_frames,
            "capture stream opened"
        );
        Ok(Box::new(CpalStreamHandle {
            stop,
            underruns,
            alive,
            thread: Some(thread),
        }))
    }
}

/// Runs on the dedicated capture thread, owning the cpal stream.
fn run_capture(
    device: cpal::Device,
    request: StreamRequest,
    mut handler: BlockHandler,
    stop: Arc<AtomicBool>,
    underruns: Arc<AtomicU64>,
    alive: Arc<AtomicBool>,
    ready_tx: mpsc::Sender<Result<(), DeviceError>>,
) {
    let config = StreamConfig {
        channels: request.channel_count,
        sample_rate: SampleRate(request.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };
    let sample_format = match device.default_input_config() {
        Ok(c) => c.sample_format(),
        Err(e) => {
            let _ = ready_tx.send(Err(DeviceError::StreamFailed(e.to_string())));
            return;
        }
    };

    let channels = request.channel_count;
    let block_len = request.block_frames * channels as usize;
    // Carves driver buffers of arbitrary size into fixed blocks
    let mut pending: Vec<f32> = Vec::with_capacity(block_len * 2);
    let mut timestamp_frames: u64 = 0;
    let mut carve = move |data: &[f32]| {
        pending.extend_from_slice(data);
        while pending.len() >= block_len {
            let rest = pending.split_off(block_len);
            let block = std::mem::replace(&mut pending, rest);
            handler(SampleBlock::new(
                channels,
                request.sample_rate,
                timestamp_frames,
                block,
            ));
            timestamp_frames += request.block_frames as u64;
        }
    };

    let err_stop = Arc::clone(&stop);
    let err_alive = Arc::clone(&alive);
    let err_underruns = Arc::clone(&underruns);
    let on_error = move |err: cpal::StreamError| {
        handle_stream_error(&err, &err_stop, &err_alive, &err_underruns);
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| carve(data),
            on_error,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let converted: Vec<f32> = data.iter().map(|&s| s as f32 / 32_768.0).collect();
                carve(&converted);
            },
            on_error,
            None,
        ),
        other => {
            let _ = ready_tx.send(Err(DeviceError::StreamFailed(format!(
                "unsupported sample format: {other}"
            ))));
            return;
        }
    };

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(DeviceError::StreamFailed(e.to_string())));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(DeviceError::StreamFailed(e.to_string())));
        return;
    }
    let _ = ready_tx.send(Ok(()));

    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    drop(stream);
    alive.store(false, Ordering::SeqCst);
}

/// A lost device is fatal: the capture thread is told to exit and the
/// handle reports dead, which drives the session's fault path. Anything
/// else is transient and only counted.
fn handle_stream_error(
    err: &cpal::StreamError,
    stop: &AtomicBool,
    alive: &AtomicBool,
    underruns: &AtomicU64,
) {
    match err {
        cpal::StreamError::DeviceNotAvailable => {
            warn!("capture device disconnected");
            alive.store(false, Ordering::SeqCst);
            stop.store(true, Ordering::SeqCst);
        }
        other => {
            underruns.fetch_add(1, Ordering::SeqCst);
            warn!(error = %other, "capture stream error");
        }
    }
}

struct CpalStreamHandle {
    stop: Arc<AtomicBool>,
    underruns: Arc<AtomicU64>,
    alive: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl StreamHandle for CpalStreamHandle {
    fn close(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::SeqCst)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

impl Drop for CpalStreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}
