//! Pure channel routing: extracts per-target blocks from a device block
//!
//! Runs inside the capture callback, so routing allocates exactly one
//! `Vec` per routed block and takes no locks.

use crate::domain::output::OutputTarget;

use super::{ChannelMap, DeviceDescriptor, InvalidChannelMap, SampleBlock};

/// Routes each device `SampleBlock` into per-target blocks.
///
/// - `Mic`: mono average of the mic channel list.
/// - `System`: verbatim projection of the system channel list, in order.
/// - `Mixed`: stereo collapse of `mic ++ system` by the pairing rule:
///   list entries pair off as (L,R) couples; an odd final entry feeds both
///   sides; each side is the average of its contributors.
#[derive(Debug, Clone)]
pub struct ChannelRouter {
    map: ChannelMap,
    mixed: Vec<usize>,
}

impl ChannelRouter {
    /// Build a router, validating the map against the live descriptor.
    /// Out-of-range indices fail here, never per-block.
    pub fn new(map: ChannelMap, descriptor: &DeviceDescriptor) -> Result<Self, InvalidChannelMap> {
        map.validate(descriptor)?;
        let mixed = map.mixed();
        Ok(Self { map, mixed })
    }

    /// Output channel count for a target.
    pub fn output_channels(&self, target: OutputTarget) -> u16 {
        match target {
            OutputTarget::Mic => 1,
            OutputTarget::System => self.map.system.len() as u16,
            OutputTarget::Mixed => 2,
        }
    }

    /// Project one device block into the block for `target`.
    pub fn route(&self, target: OutputTarget, block: &SampleBlock) -> SampleBlock {
        match target {
            OutputTarget::Mic => self.route_mono(&self.map.mic, block),
            OutputTarget::System => self.route_projection(&self.map.system, block),
            OutputTarget::Mixed => self.route_mixed(block),
        }
    }

    fn route_mono(&self, channels: &[usize], block: &SampleBlock) -> SampleBlock {
        let frames = block.frame_count();
        let mut out = Vec::with_capacity(frames);
        let scale = 1.0 / channels.len() as f32;
        for frame in 0..frames {
            let sum: f32 = channels.iter().map(|&ch| block.sample(frame, ch)).sum();
            out.push((sum * scale).clamp(-1.0, 1.0));
        }
        SampleBlock::new(1, block.sample_rate(), block.timestamp_frames(), out)
    }

    fn route_projection(&self, channels: &[usize], block: &SampleBlock) -> SampleBlock {
        let frames = block.frame_count();
        let mut out = Vec::with_capacity(frames * channels.len());
        for frame in 0..frames {
            for &ch in channels {
                out.push(block.sample(frame, ch));
            }
        }
        SampleBlock::new(
            channels.len() as u16,
            block.sample_rate(),
            block.timestamp_frames(),
            out,
        )
    }

    fn route_mixed(&self, block: &SampleBlock) -> SampleBlock {
        let frames = block.frame_count();
        let pairs: Vec<(usize, usize)> = self
            .mixed
            .chunks(2)
            .map(|pair| (pair[0], *pair.last().unwrap_or(&pair[0])))
            .collect();
        let scale = 1.0 / pairs.len() as f32;

        let mut out = Vec::with_capacity(frames * 2);
        for frame in 0..frames {
            let mut left = 0.0f32;
            let mut right = 0.0f32;
            for &(l_ch, r_ch) in &pairs {
                left += block.sample(frame, l_ch);
                right += block.sample(frame, r_ch);
            }
            out.push((left * scale).clamp(-1.0, 1.0));
            out.push((right * scale).clamp(-1.0, 1.0));
        }
        SampleBlock::new(2, block.sample_rate(), block.timestamp_frames(), out)
    }
}
