//! Encoder sink adapters
//!
//! Each sink feeds a dedicated writer thread through a bounded queue;
//! `push` never blocks the capture callback.

mod flac;
mod mp3;
mod wav;

use std::path::Path;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};

use crate::application::ports::{EncoderSink, SinkError, SinkFactory};
use crate::domain::encoding::EncodeFormat;
use crate::domain::fs::temp_recording_path;
use crate::domain::output::OutputSpec;

pub use flac::FlacSink;
pub use mp3::Mp3Sink;
pub use wav::WavSink;

/// Capacity of each sink's block queue. A full queue drops the incoming
/// block and counts it as an underrun.
pub(crate) const SINK_QUEUE_BLOCKS: usize = 100;

/// How long a sink waits for its writer thread to drain at stop.
pub(crate) const SINK_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Writer thread plus the channel its result comes back on.
///
/// The drain wait is bounded: a writer that does not finish within the
/// timeout (a wedged external encoder, a hung filesystem) is abandoned
/// and the sink fails, leaving the temp file in place for recovery.
pub(crate) struct SinkWorker {
    thread: Option<JoinHandle<()>>,
    done_rx: Receiver<Result<u64, SinkError>>,
}

impl SinkWorker {
    pub(crate) fn spawn<F>(work: F) -> Self
    where
        F: FnOnce() -> Result<u64, SinkError> + Send + 'static,
    {
        let (done_tx, done_rx) = bounded(1);
        let thread = std::thread::spawn(move || {
            let _ = done_tx.send(work());
        });
        Self {
            thread: Some(thread),
            done_rx,
        }
    }

    pub(crate) fn finish(&mut self) -> Result<u64, SinkError> {
        self.finish_within(SINK_DRAIN_TIMEOUT)
    }

    fn finish_within(&mut self, timeout: Duration) -> Result<u64, SinkError> {
        let Some(thread) = self.thread.take() else {
            return Err(SinkError::FinishFailed("sink already finished".into()));
        };
        match self.done_rx.recv_timeout(timeout) {
            Ok(result) => {
                let _ = thread.join();
                result
            }
            Err(RecvTimeoutError::Timeout) => Err(SinkError::FinishFailed(format!(
                "writer did not drain within {}s",
                timeout.as_secs()
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                let _ = thread.join();
                Err(SinkError::FinishFailed("writer thread panicked".into()))
            }
        }
    }
}

/// Opens the right sink for an output spec's format.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdSinkFactory;

impl SinkFactory for StdSinkFactory {
    fn open(
        &self,
        spec: &OutputSpec,
        dir: &Path,
        channels: u16,
        sample_rate: u32,
    ) -> Result<Box<dyn EncoderSink>, SinkError> {
        let temp = temp_recording_path(dir, &spec.base_filename, spec.format.extension());
        match spec.format {
            EncodeFormat::Wav(settings) => Ok(Box::new(WavSink::open(
                spec.target,
                temp,
                settings,
                channels,
            )?)),
            EncodeFormat::Flac(settings) => Ok(Box::new(FlacSink::open(
                spec.target,
                temp,
                settings,
                channels,
            )?)),
            EncodeFormat::Mp3(settings) => Ok(Box::new(Mp3Sink::open(
                spec.target,
                temp,
                settings,
                channels,
                sample_rate,
            )?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::encoding::WavSettings;
    use crate::domain::output::OutputTarget;

    #[test]
    fn factory_opens_wav_sink_with_temp_name() {
        let dir = tempfile::tempdir().unwrap();
        let spec = OutputSpec {
            target: OutputTarget::Mic,
            enabled: true,
            base_filename: "mic".into(),
            format: EncodeFormat::Wav(WavSettings::default()),
        };
        let sink = StdSinkFactory.open(&spec, dir.path(), 1, 48_000).unwrap();
        let name = sink.temp_path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(".mic.wav"));
        assert!(name.ends_with(".part"));
        sink.abort();
    }

    #[test]
    fn worker_result_comes_back_after_drain() {
        let mut worker = SinkWorker::spawn(|| Ok(4096));
        assert_eq!(worker.finish().unwrap(), 4096);
    }

    #[test]
    fn wedged_worker_fails_instead_of_hanging() {
        let (release_tx, release_rx) = bounded::<()>(1);
        let mut worker = SinkWorker::spawn(move || {
            let _ = release_rx.recv();
            Ok(0)
        });

        let err = worker
            .finish_within(Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, SinkError::FinishFailed(_)));

        // Unblock the abandoned thread so the test process exits cleanly
        let _ = release_tx.send(());
    }

    #[test]
    fn second_finish_reports_already_finished() {
        let mut worker = SinkWorker::spawn(|| Ok(1));
        worker.finish().unwrap();
        assert!(matches!(
            worker.finish(),
            Err(SinkError::FinishFailed(_))
        ));
    }
}
