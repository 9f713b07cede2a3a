//! Recorded-file transcription use case

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::domain::fs;

use super::ports::{Transcriber, TranscriptionError};

/// Audio extensions the external transcriber accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &["wav", "mp3", "flac", "m4a", "aac", "ogg", "aiff", "aif"];

/// Errors from the recorded-file transcription use case
#[derive(Debug, Error)]
pub enum TranscribeRecordingError {
    #[error("Recording not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Unsupported audio file: {0}")]
    UnsupportedExtension(PathBuf),

    #[error("Transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Failed to write transcript: {0}")]
    WriteFailed(String),
}

/// Supported audio files in `dir`, newest first.
pub fn list_recordings(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut recordings: Vec<(PathBuf, std::time::SystemTime)> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let supported = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()));
            if !supported || !path.is_file() {
                return None;
            }
            let mtime = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            Some((path, mtime))
        })
        .collect();
    recordings.sort_by(|a, b| b.1.cmp(&a.1));
    recordings.into_iter().map(|(path, _)| path).collect()
}

/// Input parameters for transcribing a recorded file
#[derive(Debug, Clone)]
pub struct TranscribeRecordingInput {
    pub source: PathBuf,
    /// Model name passed to the transcriber.
    pub model: String,
    /// Directory the transcript .txt is written to.
    pub transcripts_dir: PathBuf,
    /// Replace an existing transcript instead of failing.
    pub overwrite: bool,
}

/// Result of transcribing a recorded file
#[derive(Debug, Clone)]
pub struct TranscribeRecordingOutput {
    pub source: PathBuf,
    pub transcript: String,
    pub transcript_path: PathBuf,
}

/// Recorded-file transcription use case
pub struct TranscribeRecordingUseCase<T: Transcriber> {
    transcriber: T,
}

impl<T: Transcriber> TranscribeRecordingUseCase<T> {
    pub fn new(transcriber: T) -> Self {
        Self { transcriber }
    }

    /// Transcribe an existing recording and persist
    /// `<transcripts_dir>/<stem>__<model>.txt`.
    pub async fn execute(
        &self,
        input: TranscribeRecordingInput,
    ) -> Result<TranscribeRecordingOutput, TranscribeRecordingError> {
        if !input.source.is_file() {
            return Err(TranscribeRecordingError::SourceMissing(input.source));
        }
        let supported = input
            .source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()));
        if !supported {
            return Err(TranscribeRecordingError::UnsupportedExtension(input.source));
        }

        let transcript = self
            .transcriber
            .transcribe_file(&input.source, &input.model)
            .await?;

        let stem = input
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording".to_string());
        std::fs::create_dir_all(&input.transcripts_dir)
            .map_err(|e| TranscribeRecordingError::WriteFailed(e.to_string()))?;

        let preferred = input
            .transcripts_dir
            .join(format!("{stem}__{}.txt", input.model));
        let transcript_path = if input.overwrite {
            preferred
        } else if preferred.exists() {
            fs::transcript_path(&input.transcripts_dir, &stem, &input.model)
        } else {
            preferred
        };

        std::fs::write(&transcript_path, &transcript)
            .map_err(|e| TranscribeRecordingError::WriteFailed(e.to_string()))?;
        info!(
            source = %input.source.display(),
            transcript = %transcript_path.display(),
            "transcript written"
        );

        Ok(TranscribeRecordingOutput {
            source: input.source,
            transcript,
            transcript_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::CapturedAudio;
    use async_trait::async_trait;

    struct MockTranscriber;

    #[async_trait]
    impl Transcriber for MockTranscriber {
        async fn transcribe_buffer(
            &self,
            _audio: &CapturedAudio,
            _model: &str,
        ) -> Result<String, TranscriptionError> {
            Ok("buffer text".to_string())
        }

        async fn transcribe_file(
            &self,
            _path: &Path,
            _model: &str,
        ) -> Result<String, TranscriptionError> {
            Ok("file text".to_string())
        }
    }

    fn touch(path: &Path) {
        std::fs::write(path, b"riff").unwrap();
    }

    #[test]
    fn list_recordings_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.wav"));
        touch(&dir.path().join("b.txt"));
        touch(&dir.path().join("c.FLAC"));
        touch(&dir.path().join(".mic.wav.part"));

        let listed = list_recordings(dir.path());
        let names: Vec<_> = listed
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        // Extension match is case-insensitive; .txt and .part are excluded
        assert_eq!(listed.len(), 2);
        assert!(names.contains(&"a.wav".to_string()));
        assert!(names.contains(&"c.FLAC".to_string()));
    }

    #[test]
    fn list_recordings_missing_dir_is_empty() {
        assert!(list_recordings(Path::new("/nonexistent/recordings")).is_empty());
    }

    #[tokio::test]
    async fn execute_writes_model_suffixed_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("mixed__2026-01-05-10-00-00.wav");
        touch(&source);

        let use_case = TranscribeRecordingUseCase::new(MockTranscriber);
        let output = use_case
            .execute(TranscribeRecordingInput {
                source: source.clone(),
                model: "base".into(),
                transcripts_dir: dir.path().join("transcripts"),
                overwrite: false,
            })
            .await
            .unwrap();

        assert_eq!(output.transcript, "file text");
        assert_eq!(
            output.transcript_path.file_name().unwrap(),
            "mixed__2026-01-05-10-00-00__base.txt"
        );
        assert_eq!(
            std::fs::read_to_string(&output.transcript_path).unwrap(),
            "file text"
        );
    }

    #[tokio::test]
    async fn execute_without_overwrite_uses_counter() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("mic.wav");
        touch(&source);
        let transcripts = dir.path().join("transcripts");
        std::fs::create_dir_all(&transcripts).unwrap();
        std::fs::write(transcripts.join("mic__base.txt"), "old").unwrap();

        let use_case = TranscribeRecordingUseCase::new(MockTranscriber);
        let output = use_case
            .execute(TranscribeRecordingInput {
                source,
                model: "base".into(),
                transcripts_dir: transcripts.clone(),
                overwrite: false,
            })
            .await
            .unwrap();

        assert_eq!(
            output.transcript_path.file_name().unwrap(),
            "mic__base (2).txt"
        );
        assert_eq!(
            std::fs::read_to_string(transcripts.join("mic__base.txt")).unwrap(),
            "old"
        );
    }

    #[tokio::test]
    async fn execute_with_overwrite_replaces_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("mic.wav");
        touch(&source);
        let transcripts = dir.path().join("transcripts");
        std::fs::create_dir_all(&transcripts).unwrap();
        std::fs::write(transcripts.join("mic__base.txt"), "old").unwrap();

        let use_case = TranscribeRecordingUseCase::new(MockTranscriber);
        let output = use_case
            .execute(TranscribeRecordingInput {
                source,
                model: "base".into(),
                transcripts_dir: transcripts.clone(),
                overwrite: true,
            })
            .await
            .unwrap();

        assert_eq!(output.transcript_path.file_name().unwrap(), "mic__base.txt");
        assert_eq!(
            std::fs::read_to_string(transcripts.join("mic__base.txt")).unwrap(),
            "file text"
        );
    }

    #[tokio::test]
    async fn execute_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        touch(&source);

        let use_case = TranscribeRecordingUseCase::new(MockTranscriber);
        let result = use_case
            .execute(TranscribeRecordingInput {
                source,
                model: "base".into(),
                transcripts_dir: dir.path().to_path_buf(),
                overwrite: false,
            })
            .await;
        assert!(matches!(
            result,
            Err(TranscribeRecordingError::UnsupportedExtension(_))
        ));
    }

    #[tokio::test]
    async fn execute_rejects_missing_source() {
        let use_case = TranscribeRecordingUseCase::new(MockTranscriber);
        let result = use_case
            .execute(TranscribeRecordingInput {
                source: PathBuf::from("/nonexistent/mic.wav"),
                model: "base".into(),
                transcripts_dir: PathBuf::from("/tmp"),
                overwrite: false,
            })
            .await;
        assert!(matches!(
            result,
            Err(TranscribeRecordingError::SourceMissing(_))
        ));
    }
}
