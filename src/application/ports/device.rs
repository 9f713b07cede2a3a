//! Capture device port interfaces

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::domain::audio::{DeviceDescriptor, SampleBlock};

/// Capture device errors
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    #[error("Audio device not found: {0}")]
    DeviceUnavailable(String),

    #[error("Device '{device}' does not support {sample_rate} Hz / {channels} channels")]
    FormatUnsupported {
        device: String,
        sample_rate: u32,
        channels: u16,
    },

    #[error("Audio device is already in use by another capture")]
    DeviceBusy,

    #[error("Audio stream failed: {0}")]
    StreamFailed(String),
}

/// Stream parameters a caller asks the device for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub sample_rate: u32,
    pub channel_count: u16,
    /// Frames per delivered block.
    pub block_frames: usize,
}

/// Callback invoked from the capture thread for every assembled block.
pub type BlockHandler = Box<dyn FnMut(SampleBlock) + Send + 'static>;

/// Port for a multi-channel capture device
pub trait DeviceStream: Send + Sync {
    /// Probe the device and describe its input capabilities.
    fn descriptor(&self) -> Result<DeviceDescriptor, DeviceError>;

    /// Whether the platform allows concurrent captures of this device.
    /// When false, callers serialize access through a [`CaptureGate`].
    fn supports_shared_access(&self) -> bool {
        false
    }

    /// Open the stream. `handler` receives fixed-size blocks until the
    /// returned handle is closed.
    fn open(
        &self,
        request: StreamRequest,
        handler: BlockHandler,
    ) -> Result<Box<dyn StreamHandle>, DeviceError>;
}

/// Handle over an open capture stream
pub trait StreamHandle: Send {
    /// Stop the stream and release the device. Idempotent.
    fn close(&mut self);

    /// Hardware gaps reported by the driver since open.
    fn underruns(&self) -> u64;

    /// Whether the capture thread is still delivering blocks.
    fn is_alive(&self) -> bool;
}

/// Process-wide guard serializing access to a device that does not
/// support shared capture. Cloned into every component that opens
/// the device.
#[derive(Debug, Clone, Default)]
pub struct CaptureGate {
    taken: Arc<AtomicBool>,
}

impl CaptureGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the gate. Fails with [`DeviceError::DeviceBusy`] when
    /// another capture already holds it.
    pub fn acquire(&self) -> Result<GateGuard, DeviceError> {
        if self
            .taken
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Ok(GateGuard {
                taken: Arc::clone(&self.taken),
            })
        } else {
            Err(DeviceError::DeviceBusy)
        }
    }

    pub fn is_taken(&self) -> bool {
        self.taken.load(Ordering::Acquire)
    }
}

/// Releases the gate on drop.
#[derive(Debug)]
pub struct GateGuard {
    taken: Arc<AtomicBool>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.taken.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_acquire_then_busy() {
        let gate = CaptureGate::new();
        let guard = gate.acquire().unwrap();
        assert!(gate.is_taken());
        assert!(matches!(gate.acquire(), Err(DeviceError::DeviceBusy)));
        drop(guard);
        assert!(!gate.is_taken());
        assert!(gate.acquire().is_ok());
    }

    #[test]
    fn gate_clones_share_state() {
        let gate = CaptureGate::new();
        let clone = gate.clone();
        let _guard = clone.acquire().unwrap();
        assert!(matches!(gate.acquire(), Err(DeviceError::DeviceBusy)));
    }
}
