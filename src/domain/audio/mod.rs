//! Audio value objects: device descriptors, sample blocks, channel routing

pub mod channel_map;
pub mod router;

use std::sync::Arc;

pub use channel_map::{ChannelMap, InvalidChannelMap};
pub use router::ChannelRouter;

/// Default block size delivered by device streams, in frames.
pub const DEFAULT_BLOCK_FRAMES: usize = 1024;

/// Immutable snapshot of an input device, taken at enumeration time.
/// Refreshed only by an explicit re-scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub name: String,
    pub max_input_channels: u16,
    pub default_sample_rate: u32,
    pub supported_sample_rates: Vec<u32>,
}

impl DeviceDescriptor {
    pub fn supports_sample_rate(&self, rate: u32) -> bool {
        self.supported_sample_rates.contains(&rate)
    }
}

/// A fixed-length, timestamped chunk of interleaved multi-channel samples.
///
/// Produced once by the device stream and shared read-only with every
/// router and sink; the sample storage is behind an `Arc`, so cloning a
/// block never copies audio data.
#[derive(Debug, Clone)]
pub struct SampleBlock {
    channel_count: u16,
    sample_rate: u32,
    timestamp_frames: u64,
    samples: Arc<[f32]>,
}

impl SampleBlock {
    /// Wrap interleaved samples into a block.
    ///
    /// `samples.len()` must be a multiple of `channel_count`.
    pub fn new(
        channel_count: u16,
        sample_rate: u32,
        timestamp_frames: u64,
        samples: Vec<f32>,
    ) -> Self {
        debug_assert!(channel_count > 0);
        debug_assert_eq!(samples.len() % channel_count as usize, 0);
        Self {
            channel_count,
            sample_rate,
            timestamp_frames,
            samples: samples.into(),
        }
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Stream position of the first frame in this block.
    pub fn timestamp_frames(&self) -> u64 {
        self.timestamp_frames
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channel_count as usize
    }

    /// Interleaved samples: frame-major, channel-minor.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample for one frame/channel pair.
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        self.samples[frame * self.channel_count as usize + channel]
    }
}
