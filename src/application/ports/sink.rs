//! Encoder sink port interfaces

use std::path::Path;

use thiserror::Error;

use crate::domain::audio::SampleBlock;
use crate::domain::output::{OutputArtifact, OutputSpec, OutputTarget};

/// Encoder sink errors
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    #[error("External encoder '{tool}' not found on PATH")]
    EncoderUnavailable { tool: String },

    #[error("Failed to open output file: {0}")]
    OpenFailed(String),

    #[error("Failed to write encoded audio: {0}")]
    WriteFailed(String),

    #[error("Failed to finalize output file: {0}")]
    FinishFailed(String),
}

/// Port for one output file being encoded during a recording.
///
/// A sink is opened against a temp path before any audio flows, fed
/// routed blocks while recording, and either finished (flush, close,
/// rename to `final_path`) or aborted (discard, delete temp).
pub trait EncoderSink: Send {
    fn target(&self) -> OutputTarget;

    /// Temp file the sink is writing to until finish renames it.
    fn temp_path(&self) -> &Path;

    /// Enqueue a routed block. Never blocks the caller; when the sink
    /// cannot keep up the block is dropped and counted instead.
    fn push(&mut self, block: &SampleBlock) -> Result<(), SinkError>;

    /// Blocks dropped by a saturated queue since open.
    fn dropped_blocks(&self) -> u64;

    /// Flush, close, and rename the temp file to `final_path`.
    fn finish(self: Box<Self>, final_path: &Path) -> Result<OutputArtifact, SinkError>;

    /// Discard the sink and best-effort delete its temp file.
    /// Used when session start fails after some sinks already opened.
    fn abort(self: Box<Self>);
}

/// Port for opening encoder sinks by output spec.
pub trait SinkFactory: Send + Sync {
    /// Open a sink for `spec` writing to a temp file under `dir`.
    ///
    /// `channels` and `sample_rate` describe the routed audio the sink
    /// will receive, already reduced per target.
    fn open(
        &self,
        spec: &OutputSpec,
        dir: &Path,
        channels: u16,
        sample_rate: u32,
    ) -> Result<Box<dyn EncoderSink>, SinkError>;
}
