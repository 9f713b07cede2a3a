//! Push-to-talk capture port interface

use crate::application::ports::device::DeviceError;

/// Mono audio captured between a press and a release.
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl CapturedAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Port for edge-driven dictation capture.
///
/// `start` begins accumulating on the press edge; `stop` ends capture on
/// the release edge and returns everything accumulated in between.
pub trait DictationCapture: Send + Sync {
    fn start(&self, sample_rate: u32) -> Result<(), DeviceError>;

    fn stop(&self) -> Result<CapturedAudio, DeviceError>;

    fn is_capturing(&self) -> bool;
}
