//! Streaming WAV sink backed by hound

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Sender, TrySendError};
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::debug;

use crate::application::ports::{EncoderSink, SinkError};
use crate::domain::audio::SampleBlock;
use crate::domain::encoding::WavSettings;
use crate::domain::output::{OutputArtifact, OutputTarget};

use super::{SinkWorker, SINK_QUEUE_BLOCKS};

pub struct WavSink {
    target: OutputTarget,
    temp_path: PathBuf,
    tx: Option<Sender<SampleBlock>>,
    worker: SinkWorker,
    dropped: Arc<AtomicU64>,
}

impl WavSink {
    pub fn open(
        target: OutputTarget,
        temp_path: PathBuf,
        settings: WavSettings,
        channels: u16,
    ) -> Result<Self, SinkError> {
        let spec = WavSpec {
            channels,
            sample_rate: settings.sample_rate,
            bits_per_sample: settings.bit_depth,
            sample_format: SampleFormat::Int,
        };
        let writer =
            WavWriter::create(&temp_path, spec).map_err(|e| SinkError::OpenFailed(e.to_string()))?;

        let (tx, rx) = bounded::<SampleBlock>(SINK_QUEUE_BLOCKS);
        let bit_depth = settings.bit_depth;
        let worker = SinkWorker::spawn(move || {
            let mut writer = writer;
            let mut frames: u64 = 0;
            for block in rx {
                for &sample in block.samples() {
                    let clamped = sample.clamp(-1.0, 1.0);
                    let result = if bit_depth == 24 {
                        writer.write_sample((clamped * 8_388_607.0) as i32)
                    } else {
                        writer.write_sample((clamped * 32_767.0) as i16)
                    };
                    result.map_err(|e| SinkError::WriteFailed(e.to_string()))?;
                }
                frames += block.frame_count() as u64;
            }
            writer
                .finalize()
                .map_err(|e| SinkError::FinishFailed(e.to_string()))?;
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

impl EncoderSink for WavSink {
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
                // Writer fell behind; drop the newest block and count it
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
        debug!(path = %final_path.display(), frames, bytes, "wav sink finalized");
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
