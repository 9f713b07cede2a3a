//! Dictation mic capture backed by cpal
//!
//! Captures mono i16 at whatever rate the device opens with, then
//! resamples to the requested dictation rate (default 16 kHz) at stop.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use rubato::{FftFixedIn, Resampler};
use tracing::{debug, warn};

use crate::application::ports::{CapturedAudio, DeviceError, DictationCapture};

/// Dictation capture adapter. An empty name selects the host default
/// input device.
pub struct CpalMicCapture {
    device_name: String,
    buffer: Arc<Mutex<Vec<i16>>>,
    device_rate: Arc<AtomicU32>,
    target_rate: AtomicU32,
    capturing: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl CpalMicCapture {
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            buffer: Arc::new(Mutex::new(Vec::new())),
            device_rate: Arc::new(AtomicU32::new(0)),
            target_rate: AtomicU32::new(0),
            capturing: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
        }
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

    /// Average interleaved frames down to one channel.
    fn to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
        if channels <= 1 {
            return samples.to_vec();
        }
        samples
            .chunks(channels as usize)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    }

    fn resample(samples: &[i16], source_rate: u32, target_rate: u32) -> Result<Vec<i16>, DeviceError> {
        if source_rate == target_rate || samples.is_empty() {
            return Ok(samples.to_vec());
        }

        let samples_f32: Vec<f32> = samples.iter().map(|&s| s as f32 / 32_768.0).collect();
        let ratio = target_rate as f64 / source_rate as f64;
        let output_len = (samples_f32.len() as f64 * ratio).ceil() as usize;

        let mut resampler =
            FftFixedIn::<f32>::new(source_rate as usize, target_rate as usize, 1024, 2, 1)
                .map_err(|e| DeviceError::StreamFailed(format!("resampler init: {e}")))?;

        let mut output = Vec::with_capacity(output_len);
        let mut input_pos = 0;
        while input_pos < samples_f32.len() {
            let frames_needed = resampler.input_frames_next();
            let end_pos = (input_pos + frames_needed).min(samples_f32.len());
            let mut chunk = samples_f32[input_pos..end_pos].to_vec();
            chunk.resize(frames_needed, 0.0);

            let resampled = resampler
                .process(&[chunk], None)
                .map_err(|e| DeviceError::StreamFailed(format!("resampling: {e}")))?;
            output.extend(resampled[0].iter().map(|&s| (s * 32_767.0) as i16));
            input_pos = end_pos;
        }
        output.truncate(output_len);
        Ok(output)
    }
}

impl DictationCapture for CpalMicCapture {
    fn start(&self, sample_rate: u32) -> Result<(), DeviceError> {
        if self.capturing.swap(true, Ordering::SeqCst) {
            return Err(DeviceError::DeviceBusy);
        }
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.clear();
        }
        self.target_rate.store(sample_rate, Ordering::SeqCst);

        let device = match self.find_device() {
            Ok(d) => d,
            Err(e) => {
                self.capturing.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let buffer = Arc::clone(&self.buffer);
        let device_rate = Arc::clone(&self.device_rate);
        let capturing = Arc::clone(&self.capturing);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), DeviceError>>();

        let thread = std::thread::spawn(move || {
            run_capture(device, sample_rate, buffer, device_rate, capturing, ready_tx);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                *lock_ignore_poison(&self.thread) = Some(thread);
                debug!("dictation capture stream opened");
                Ok(())
            }
            Ok(Err(e)) => {
                self.capturing.store(false, Ordering::SeqCst);
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                self.capturing.store(false, Ordering::SeqCst);
                let _ = thread.join();
                Err(DeviceError::StreamFailed(
                    "capture thread exited before the stream opened".into(),
                ))
            }
        }
    }

    fn stop(&self) -> Result<CapturedAudio, DeviceError> {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(thread) = lock_ignore_poison(&self.thread).take() {
            let _ = thread.join();
        }

        let samples = {
            let mut buffer = lock_ignore_poison(&self.buffer);
            std::mem::take(&mut *buffer)
        };
        let source_rate = self.device_rate.load(Ordering::SeqCst);
        let target_rate = self.target_rate.load(Ordering::SeqCst);
        let samples = Self::resample(&samples, source_rate, target_rate)?;

        Ok(CapturedAudio {
            samples,
            sample_rate: target_rate,
        })
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }
}

fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Runs on the dedicated capture thread, owning the cpal stream.
fn run_capture(
    device: cpal::Device,
    preferred_rate: u32,
    buffer: Arc<Mutex<Vec<i16>>>,
    device_rate: Arc<AtomicU32>,
    capturing: Arc<AtomicBool>,
    ready_tx: mpsc::Sender<Result<(), DeviceError>>,
) {
    let default = match device.default_input_config() {
        Ok(c) => c,
        Err(e) => {
            let _ = ready_tx.send(Err(DeviceError::StreamFailed(e.to_string())));
            return;
        }
    };

    // Open at the dictation rate when the hardware allows it, otherwise
    // at the device default and resample later
    let rate_supported = device
        .supported_input_configs()
        .map(|mut configs| {
            configs.any(|c| {
                c.min_sample_rate().0 <= preferred_rate && preferred_rate <= c.max_sample_rate().0
            })
        })
        .unwrap_or(false);
    let sample_rate = if rate_supported {
        SampleRate(preferred_rate)
    } else {
        default.sample_rate()
    };
    device_rate.store(sample_rate.0, Ordering::SeqCst);

    let channels = default.channels();
    let config = StreamConfig {
        channels,
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let cb_buffer = Arc::clone(&buffer);
    let cb_capturing = Arc::clone(&capturing);
    let on_error = |err: cpal::StreamError| warn!(error = %err, "dictation stream error");

    let stream = match default.sample_format() {
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if cb_capturing.load(Ordering::SeqCst) {
                    let mono = CpalMicCapture::to_mono(data, channels);
                    if let Ok(mut buffer) = cb_buffer.lock() {
                        buffer.extend_from_slice(&mono);
                    }
                }
            },
            on_error,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if cb_capturing.load(Ordering::SeqCst) {
                    let converted: Vec<i16> =
                        data.iter().map(|&s| (s * 32_767.0) as i16).collect();
                    let mono = CpalMicCapture::to_mono(&converted, channels);
                    if let Ok(mut buffer) = cb_buffer.lock() {
                        buffer.extend_from_slice(&mono);
                    }
                }
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

    while capturing.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    drop(stream);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_mono_single_channel_passthrough() {
        let mono = vec![100i16, 200, 300];
        assert_eq!(CpalMicCapture::to_mono(&mono, 1), mono);
    }

    #[test]
    fn to_mono_averages_pairs() {
        let stereo = vec![100i16, 200, 300, 400];
        assert_eq!(CpalMicCapture::to_mono(&stereo, 2), vec![150, 350]);
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let samples = vec![1i16, 2, 3, 4];
        let out = CpalMicCapture::resample(&samples, 16_000, 16_000).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn resample_halves_length() {
        let samples: Vec<i16> = (0..32_000).map(|i| (i % 100) as i16).collect();
        let out = CpalMicCapture::resample(&samples, 32_000, 16_000).unwrap();
        assert_eq!(out.len(), 16_000);
    }
}
