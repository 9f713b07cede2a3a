//! MP3 sink piping raw PCM into an external `lame` process

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Sender, TrySendError};
use tracing::debug;

use crate::application::ports::{EncoderSink, SinkError};
use crate::domain::audio::SampleBlock;
use crate::domain::encoding::Mp3Settings;
use crate::domain::output::{OutputArtifact, OutputTarget};

use super::{SinkWorker, SINK_QUEUE_BLOCKS};

pub struct Mp3Sink {
    target: OutputTarget,
    temp_path: PathBuf,
    tx: Option<Sender<SampleBlock>>,
    worker: SinkWorker,
    dropped: Arc<AtomicU64>,
}

impl Mp3Sink {
    pub fn open(
        target: OutputTarget,
        temp_path: PathBuf,
        settings: Mp3Settings,
        channels: u16,
        sample_rate: u32,
    ) -> Result<Self, SinkError> {
        let child = spawn_lame(&temp_path, &settings, channels, sample_rate)?;

        let (tx, rx) = bounded::<SampleBlock>(SINK_QUEUE_BLOCKS);
        let worker = SinkWorker::spawn(move || {
            let mut child = child;
            let Some(mut stdin) = child.stdin.take() else {
                return Err(SinkError::OpenFailed("lame stdin not captured".into()));
            };
            let mut frames: u64 = 0;
            for block in rx {
                let mut bytes = Vec::with_capacity(block.samples().len() * 2);
                for &sample in block.samples() {
                    let value = (sample.clamp(-1.0, 1.0) * 32_767.0) as i16;
                    bytes.extend_from_slice(&value.to_le_bytes());
                }
                stdin
                    .write_all(&bytes)
                    .map_err(|e| SinkError::WriteFailed(e.to_string()))?;
                frames += block.frame_count() as u64;
            }
            // Closing stdin lets lame flush and exit
            drop(stdin);
            let status = child
                .wait()
                .map_err(|e| SinkError::FinishFailed(e.to_string()))?;
            if !status.success() {
                return Err(SinkError::FinishFailed(format!("lame exited with {status}")));
            }
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

fn spawn_lame(
    temp_path: &Path,
    settings: &Mp3Settings,
    channels: u16,
    sample_rate: u32,
) -> Result<Child, SinkError> {
    let mode = if channels == 1 { "m" } else { "j" };
    let khz = format!("{}", sample_rate as f64 / 1000.0);
    Command::new("lame")
        .args([
            "-r",
            "-s",
            &khz,
            "--signed",
            "--bitwidth",
            "16",
            "--little-endian",
            "-m",
            mode,
            "-b",
            &settings.bitrate_kbps.to_string(),
            "--cbr",
            "--quiet",
            "-",
        ])
        .arg(temp_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SinkError::EncoderUnavailable {
                    tool: "lame".into(),
                }
            } else {
                SinkError::OpenFailed(e.to_string())
            }
        })
}

impl EncoderSink for Mp3Sink {
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
                Err(SinkError::WriteFailed("encoder process exited".into()))
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
        debug!(path = %final_path.display(), frames, bytes, "mp3 sink finalized");
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
