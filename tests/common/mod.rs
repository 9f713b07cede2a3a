//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use talktally::application::ports::{
    BlockHandler, DeviceError, DeviceStream, PasteError, StreamHandle, StreamRequest, TextPaster,
};
use talktally::domain::audio::{DeviceDescriptor, SampleBlock};

/// Deterministic capture device: every frame carries a fixed value per
/// channel, and all blocks are delivered synchronously at open time.
pub struct SyntheticDevice {
    channel_values: Vec<f32>,
    sample_rate: u32,
    blocks: usize,
}

impl SyntheticDevice {
    pub fn new(channel_values: Vec<f32>, sample_rate: u32, blocks: usize) -> Self {
        Self {
            channel_values,
            sample_rate,
            blocks,
        }
    }
}

impl DeviceStream for SyntheticDevice {
    fn descriptor(&self) -> Result<DeviceDescriptor, DeviceError> {
        Ok(DeviceDescriptor {
            name: "Synthetic Aggregate".to_string(),
            max_input_channels: self.channel_values.len() as u16,
            default_sample_rate: self.sample_rate,
            supported_sample_rates: vec![16_000, 44_100, 48_000, self.sample_rate],
        })
    }

    fn open(
        &self,
        request: StreamRequest,
        mut handler: BlockHandler,
    ) -> Result<Box<dyn StreamHandle>, DeviceError> {
        let channels = request.channel_count as usize;
        for index in 0..self.blocks {
            let mut samples = Vec::with_capacity(channels * request.block_frames);
            for _ in 0..request.block_frames {
                for ch in 0..channels {
                    samples.push(self.channel_values.get(ch).copied().unwrap_or(0.0));
                }
            }
            handler(SampleBlock::new(
                request.channel_count,
                request.sample_rate,
                (index * request.block_frames) as u64,
                samples,
            ));
        }
        Ok(Box::new(SyntheticHandle { closed: false }))
    }
}

pub struct SyntheticHandle {
    closed: bool,
}

impl StreamHandle for SyntheticHandle {
    fn close(&mut self) {
        self.closed = true;
    }

    fn underruns(&self) -> u64 {
        0
    }

    fn is_alive(&self) -> bool {
        !self.closed
    }
}

/// Paster that records what it was asked to paste.
#[derive(Clone, Default)]
pub struct RecordingPaster {
    pasted: Arc<Mutex<Vec<String>>>,
}

impl RecordingPaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pasted(&self) -> Vec<String> {
        self.pasted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextPaster for RecordingPaster {
    async fn paste(&self, text: &str) -> Result<(), PasteError> {
        self.pasted.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
