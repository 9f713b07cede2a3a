//! External speech-to-text CLI adapter

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::application::ports::{CapturedAudio, TranscriptionError, Transcriber};

/// Transcriber backed by a local CLI tool.
///
/// Two invocation styles are supported. When the command's basename is
/// `whisper`, the OpenAI whisper CLI conventions are used: output is
/// requested as a txt artifact in a scratch directory and read back from
/// disk. Any other command is treated as a stdout tool that prints the
/// transcript directly.
pub struct WhisperCliTranscriber {
    command: String,
}

impl WhisperCliTranscriber {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn is_whisper_cli(&self) -> bool {
        Path::new(&self.command)
            .file_name()
            .map(|n| n.eq_ignore_ascii_case("whisper"))
            .unwrap_or(false)
    }

    /// Write the captured buffer to a scratch WAV file for the external tool.
    fn stage_wav(dir: &Path, audio: &CapturedAudio) -> Result<PathBuf, TranscriptionError> {
        let path = dir.join("capture.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: audio.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec)
            .map_err(|e| TranscriptionError::StagingFailed(e.to_string()))?;
        for &sample in &audio.samples {
            writer
                .write_sample(sample)
                .map_err(|e| TranscriptionError::StagingFailed(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| TranscriptionError::StagingFailed(e.to_string()))?;
        Ok(path)
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output, TranscriptionError> {
        debug!(command = %self.command, ?args, "running transcriber");
        Command::new(&self.command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscriptionError::ToolNotFound(self.command.clone())
                } else {
                    TranscriptionError::LaunchFailed(e.to_string())
                }
            })
    }

    fn check_status(output: &std::process::Output) -> Result<(), TranscriptionError> {
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Err(TranscriptionError::ProcessFailed {
            status: output.status.to_string(),
            stderr: if stderr.is_empty() { stdout } else { stderr },
        })
    }

    /// Collapse CR/LF into spaces so the transcript pastes as one line.
    fn normalize(text: &str) -> String {
        text.replace('\r', " ").replace('\n', " ").trim().to_string()
    }

    fn non_empty(text: String) -> Result<String, TranscriptionError> {
        if text.is_empty() {
            Err(TranscriptionError::EmptyTranscript)
        } else {
            Ok(text)
        }
    }

    async fn transcribe_whisper(
        &self,
        path: &Path,
        model: &str,
    ) -> Result<String, TranscriptionError> {
        let scratch = tempfile::tempdir()
            .map_err(|e| TranscriptionError::StagingFailed(e.to_string()))?;
        let path_arg = path.to_string_lossy().into_owned();
        let dir_arg = scratch.path().to_string_lossy().into_owned();
        let output = self
            .run(&[
                &path_arg,
                "--model",
                model,
                "--output_dir",
                &dir_arg,
                "--output_format",
                "txt",
                "--verbose",
                "False",
            ])
            .await?;
        Self::check_status(&output)?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let txt_path = scratch.path().join(format!("{stem}.txt"));
        let mut text = std::fs::read_to_string(&txt_path).unwrap_or_default();
        if Self::normalize(&text).is_empty() {
            let json_path = scratch.path().join(format!("{stem}.json"));
            if let Some(joined) = Self::read_json_segments(&json_path) {
                debug!("whisper json fallback used");
                text = joined;
            }
        }
        Self::non_empty(Self::normalize(&text))
    }

    /// Some whisper builds leave a JSON artifact alongside the txt; when
    /// the txt is missing or empty, stitch the transcript back together
    /// from its segments the way whisper itself would.
    fn read_json_segments(path: &Path) -> Option<String> {
        let raw = std::fs::read_to_string(path).ok()?;
        let payload: serde_json::Value = serde_json::from_str(&raw).ok()?;
        let segments = payload.get("segments")?.as_array()?;
        let text = segments
            .iter()
            .filter_map(|seg| seg.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join(" ");
        Some(text)
    }

    async fn transcribe_stdout_tool(&self, path: &Path) -> Result<String, TranscriptionError> {
        let path_arg = path.to_string_lossy().into_owned();
        let output = self.run(&[&path_arg]).await?;
        Self::check_status(&output)?;
        let text = String::from_utf8_lossy(&output.stdout);
        Self::non_empty(Self::normalize(&text))
    }
}

#[async_trait]
impl Transcriber for WhisperCliTranscriber {
    async fn transcribe_buffer(
        &self,
        audio: &CapturedAudio,
        model: &str,
    ) -> Result<String, TranscriptionError> {
        let staging = tempfile::tempdir()
            .map_err(|e| TranscriptionError::StagingFailed(e.to_string()))?;
        let wav_path = Self::stage_wav(staging.path(), audio)?;
        self.transcribe_file(&wav_path, model).await
    }

    async fn transcribe_file(
        &self,
        path: &Path,
        model: &str,
    ) -> Result<String, TranscriptionError> {
        if self.is_whisper_cli() {
            self.transcribe_whisper(path, model).await
        } else {
            self.transcribe_stdout_tool(path).await
        }
    }
}
