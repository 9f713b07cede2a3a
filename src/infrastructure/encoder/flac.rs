//! FLAC sink backed by flacenc
//!
//! flacenc has no incremental file API, so the writer thread accumulates
//! interleaved i32 PCM and the whole stream is encoded at finish. Memory
//! is bounded by recording length.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Sender, TrySendError};
use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::config;
use flacenc::error::Verify;
use flacenc::source::MemSource;
use tracing::debug;

use crate::application::ports::{EncoderSink, SinkError};
use crate::domain::audio::SampleBlock;
use crate::domain::encoding::FlacSettings;
use crate::domain::output::{OutputArtifact, OutputTarget};

use super::{SinkWorker, SINK_QUEUE_BLOCKS};

pub struct FlacSink {
    target: OutputTarget,
    temp_path: PathBuf,
    tx: Option<Sender<SampleBlock>>,
    worker: SinkWorker,
    dropped: Arc<AtomicU64>,
}

impl FlacSink {
    pub fn open(
        target: OutputTarget,
        temp_path: PathBuf,
        settings: FlacSettings,
        channels: u16,
    ) -> Result<Self, SinkError> {
        // Touch the temp file up front so a crash leaves evidence of the
        // interrupted recording
        std::fs::write(&temp_path, []).map_err(|e| SinkError::OpenFailed(e.to_string()))?;

        let (tx, rx) = bounded::<SampleBlock>(SINK_QUEUE_BLOCKS);
        let path = temp_path.clone();
        let worker = SinkWorker::spawn(move || {
            let scale = if settings.bit_depth == 24 {
                8_388_607.0
            } else {
                32_767.0
            };
            let mut pcm: Vec<i32> = Vec::new();
            let mut frames: u64 = 0;
            for block in rx {
                pcm.extend(
                    block
                        .samples()
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * scale) as i32),
                );
                frames += block.frame_count() as u64;
            }
            let bytes = encode(&pcm, channels, &settings)?;
            std::fs::write(&path, bytes).map_err(|e| SinkError::WriteFailed(e.to_string()))?;
            Ok(frames)
        });

        Ok(Self {
            target,
            temp_path,
            tx: Some(tx),
            worker,
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    fn join_worker(&mut self) -> Result<u64, SinkError> {
        self.tx = None;
        self.worker.finish()
    }
}

/// Encode the accumulated PCM stream.
///
/// flacenc exposes no 0-8 preset knob; the configured level is validated
/// upstream and the encoder runs with its default parameters.
fn encode(pcm: &[i32], channels: u16, settings: &FlacSettings) -> Result<Vec<u8>, SinkError> {
    let config = config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| SinkError::FinishFailed(format!("flac config: {e:?}")))?;
    let source = MemSource::from_samples(
        pcm,
        channels as usize,
        settings.bit_depth as usize,
        settings.sample_rate as usize,
    );
    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| SinkError::FinishFailed(format!("flac encode: {e:?}")))?;
    let mut sink = ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|e| SinkError::FinishFailed(e.to_string()))?;
    Ok(sink.into_inner())
}

impl EncoderSink for FlacSink {
    fn target(&self) -> OutputTarget {
        self.target
    }

    fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    fn push(&mut self, block: &SampleBlock) -> Result<(), SinkError> {
        let Some(tx) = &self.tx else {
            return Err(SinkError::WriteFailed("sink already closed".into()));
        };
        match tx.try_send(block.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(SinkError::WriteFailed("writer thread exited".into()))
            }
        }
    }

    fn dropped_blocks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn finish(mut self: Box<Self>, final_path: &Path) -> Result<OutputArtifact, SinkError> {
        let frames = self.join_worker()?;
        std::fs::rename(&self.temp_path, final_path)
            .map_err(|e| SinkError::FinishFailed(e.to_string()))?;
        let bytes = std::fs::metadata(final_path)
            .map(|m| m.len())
            .map_err(|e| SinkError::FinishFailed(e.to_string()))?;
        debug!(path = %final_path.display(), frames, bytes, "flac sink finalized");
        Ok(OutputArtifact {
            target: self.target,
            path: final_path.to_path_buf(),
            bytes,
            frames,
        })
    }

    fn abort(mut self: Box<Self>) {
        let _ = self.join_worker();
        let _ = std::fs::remove_file(&self.temp_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_block(frames: usize) -> SampleBlock {
        let samples: Vec<f32> = (0..frames)
            .map(|i| {
                let t = i as f32 / 48_000.0;
                f32::sin(2.0 * std::f32::consts::PI * 440.0 * t) * 0.5
            })
            .collect();
        SampleBlock::new(1, 48_000, 0, samples)
    }

    #[test]
    fn produces_flac_magic() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join(".mic.flac.part");
        let mut sink = Box::new(
            FlacSink::open(OutputTarget::Mic, temp, FlacSettings::default(), 1).unwrap(),
        );
        sink.push(&sine_block(4096)).unwrap();

        let final_path = dir.path().join("mic.flac");
        let artifact = sink.finish(&final_path).unwrap();
        assert_eq!(artifact.frames, 4096);

        let data = std::fs::read(&final_path).unwrap();
        assert_eq!(&data[0..4], b"fLaC");
    }

    #[test]
    fn abort_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join(".mic.flac.part");
        let sink = Box::new(
            FlacSink::open(OutputTarget::Mic, temp.clone(), FlacSettings::default(), 1).unwrap(),
        );
        assert!(temp.exists());
        sink.abort();
        assert!(!temp.exists());
    }
}
