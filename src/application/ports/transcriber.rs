//! Transcription port interface

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::ports::capture::CapturedAudio;

/// Transcription errors
#[derive(Debug, Clone, Error)]
pub enum TranscriptionError {
    #[error("Transcriber command not found: {0}")]
    ToolNotFound(String),

    #[error("Failed to launch transcriber: {0}")]
    LaunchFailed(String),

    #[error("Transcriber exited with {status}: {stderr}")]
    ProcessFailed { status: String, stderr: String },

    #[error("Transcriber produced no text")]
    EmptyTranscript,

    #[error("Failed to stage audio for transcription: {0}")]
    StagingFailed(String),
}

/// Port for an external speech-to-text process
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a captured buffer.
    ///
    /// # Arguments
    /// * `audio` - Mono PCM captured between press and release
    /// * `model` - Model name passed to the external tool
    ///
    /// # Returns
    /// The transcribed text, never empty
    async fn transcribe_buffer(
        &self,
        audio: &CapturedAudio,
        model: &str,
    ) -> Result<String, TranscriptionError>;

    /// Transcribe an existing audio file on disk.
    async fn transcribe_file(
        &self,
        path: &Path,
        model: &str,
    ) -> Result<String, TranscriptionError>;
}
