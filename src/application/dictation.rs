//! Push-to-talk dictation use case
//!
//! Edge-driven: `hold_down` on the press edge, `hold_up` on the release
//! edge. Transcription runs without holding the state lock, so a press
//! arriving mid-transcription is observed and dropped rather than queued.

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::config::Settings;
use crate::domain::dictation::{DictationMachine, DictationState, InvalidDictationTransition};

use super::ports::{
    CaptureGate, DeviceError, DictationCapture, GateGuard, PasteError, TextPaster, Transcriber,
    TranscriptionError,
};

/// Errors from the dictation use case
#[derive(Debug, Error)]
pub enum DictationError {
    #[error(transparent)]
    InvalidState(#[from] InvalidDictationTransition),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("Transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error(transparent)]
    Paste(#[from] PasteError),
}

/// Configuration for dictation
#[derive(Debug, Clone)]
pub struct DictationConfig {
    /// External transcriber command (name or absolute path).
    pub command: String,
    /// Model name passed to the transcriber.
    pub model: String,
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
}

impl DictationConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            command: settings.dictation_command_or_default().to_string(),
            model: settings.dictation_model_or_default().to_string(),
            sample_rate: settings.dictation_sample_rate_or_default(),
        }
    }
}

struct Inner {
    machine: DictationMachine,
    gate_guard: Option<GateGuard>,
}

/// Dictation use case
pub struct DictationController<C, T, P>
where
    C: DictationCapture,
    T: Transcriber,
    P: TextPaster,
{
    capture: C,
    transcriber: T,
    paster: P,
    gate: CaptureGate,
    config: DictationConfig,
    inner: Mutex<Inner>,
}

impl<C, T, P> DictationController<C, T, P>
where
    C: DictationCapture,
    T: Transcriber,
    P: TextPaster,
{
    pub fn new(
        capture: C,
        transcriber: T,
        paster: P,
        gate: CaptureGate,
        config: DictationConfig,
    ) -> Self {
        Self {
            capture,
            transcriber,
            paster,
            gate,
            config,
            inner: Mutex::new(Inner {
                machine: DictationMachine::new(),
                gate_guard: None,
            }),
        }
    }

    pub async fn state(&self) -> DictationState {
        self.inner.lock().await.machine.state()
    }

    /// Press edge. Starts capture when idle; a press in any other state
    /// is dropped.
    pub async fn hold_down(&self) -> Result<(), DictationError> {
        let mut inner = self.inner.lock().await;
        if !inner.machine.is_idle() {
            debug!(state = %inner.machine.state(), "press ignored");
            return Ok(());
        }

        let guard = self.gate.acquire()?;
        if let Err(e) = self.capture.start(self.config.sample_rate) {
            drop(guard);
            return Err(e.into());
        }
        inner.machine.begin_capture()?;
        inner.gate_guard = Some(guard);
        debug!("dictation capture started");
        Ok(())
    }

    /// Release edge. Stops capture, transcribes, and pastes the result.
    ///
    /// Returns the pasted text, or `None` when no capture was active
    /// (a stray release). Failures discard the buffer and return the
    /// controller to idle; there is no retry.
    pub async fn hold_up(&self) -> Result<Option<String>, DictationError> {
        let audio = {
            let mut inner = self.inner.lock().await;
            if !inner.machine.is_capturing() {
                debug!(state = %inner.machine.state(), "release ignored");
                return Ok(None);
            }
            inner.machine.begin_transcribe()?;

            let stopped = self.capture.stop();
            // Release the device before the slow transcription phase
            inner.gate_guard = None;
            match stopped {
                Ok(audio) => audio,
                Err(e) => {
                    inner.machine.fail();
                    inner.machine.reset();
                    return Err(e.into());
                }
            }
        };

        debug!(
            samples = audio.samples.len(),
            secs = audio.duration_secs(),
            "dictation capture stopped"
        );

        let result = if audio.is_empty() {
            Err(TranscriptionError::EmptyTranscript.into())
        } else {
            self.transcribe_and_paste(&audio).await
        };

        let mut inner = self.inner.lock().await;
        match result {
            Ok(text) => {
                // begin_transcribe succeeded, so complete cannot fail
                let _ = inner.machine.complete();
                info!(chars = text.len(), "dictation pasted");
                Ok(Some(text))
            }
            Err(e) => {
                warn!(error = %e, "dictation failed, buffer discarded");
                inner.machine.fail();
                inner.machine.reset();
                Err(e)
            }
        }
    }

    async fn transcribe_and_paste(
        &self,
        audio: &super::ports::CapturedAudio,
    ) -> Result<String, DictationError> {
        let text = self
            .transcriber
            .transcribe_buffer(audio, &self.config.model)
            .await?;
        self.paster.paste(&text).await?;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::CapturedAudio;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};

    struct MockCapture {
        capturing: AtomicBool,
        samples: Vec<i16>,
    }

    impl MockCapture {
        fn with_samples(samples: Vec<i16>) -> Self {
            Self {
                capturing: AtomicBool::new(false),
                samples,
            }
        }
    }

    impl DictationCapture for MockCapture {
        fn start(&self, _sample_rate: u32) -> Result<(), DeviceError> {
            self.capturing.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) -> Result<CapturedAudio, DeviceError> {
            self.capturing.store(false, Ordering::SeqCst);
            Ok(CapturedAudio {
                samples: self.samples.clone(),
                sample_rate: 16_000,
            })
        }

        fn is_capturing(&self) -> bool {
            self.capturing.load(Ordering::SeqCst)
        }
    }

    struct MockTranscriber {
        text: String,
        fail: bool,
    }

    #[async_trait]
    impl Transcriber for MockTranscriber {
        async fn transcribe_buffer(
            &self,
            _audio: &CapturedAudio,
            _model: &str,
        ) -> Result<String, TranscriptionError> {
            if self.fail {
                Err(TranscriptionError::EmptyTranscript)
            } else {
                Ok(self.text.clone())
            }
        }

        async fn transcribe_file(
            &self,
            _path: &Path,
            _model: &str,
        ) -> Result<String, TranscriptionError> {
            Ok(self.text.clone())
        }
    }

    #[derive(Default)]
    struct MockPaster {
        pasted: Arc<StdMutex<Vec<String>>>,
        count: Arc<AtomicU64>,
    }

    #[async_trait]
    impl TextPaster for MockPaster {
        async fn paste(&self, text: &str) -> Result<(), PasteError> {
            self.pasted.lock().unwrap().push(text.to_string());
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config() -> DictationConfig {
        DictationConfig {
            command: "whisper".into(),
            model: "base".into(),
            sample_rate: 16_000,
        }
    }

    #[tokio::test]
    async fn press_release_pastes_once() {
        let count = Arc::new(AtomicU64::new(0));
        let paster = MockPaster {
            count: Arc::clone(&count),
            ..Default::default()
        };
        let controller = DictationController::new(
            MockCapture::with_samples(vec![100; 1600]),
            MockTranscriber {
                text: "hello world".into(),
                fail: false,
            },
            paster,
            CaptureGate::new(),
            config(),
        );

        controller.hold_down().await.unwrap();
        assert_eq!(controller.state().await, DictationState::Capturing);
        let text = controller.hold_up().await.unwrap();
        assert_eq!(text.as_deref(), Some("hello world"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state().await, DictationState::Idle);
    }

    #[tokio::test]
    async fn stray_release_is_dropped() {
        let controller = DictationController::new(
            MockCapture::with_samples(vec![]),
            MockTranscriber {
                text: String::new(),
                fail: false,
            },
            MockPaster::default(),
            CaptureGate::new(),
            config(),
        );

        assert_eq!(controller.hold_up().await.unwrap(), None);
        assert_eq!(controller.state().await, DictationState::Idle);
    }

    #[tokio::test]
    async fn repeated_press_is_dropped() {
        let gate = CaptureGate::new();
        let controller = DictationController::new(
            MockCapture::with_samples(vec![1; 160]),
            MockTranscriber {
                text: "x".into(),
                fail: false,
            },
            MockPaster::default(),
            gate.clone(),
            config(),
        );

        controller.hold_down().await.unwrap();
        // Second press while capturing neither errors nor re-acquires
        controller.hold_down().await.unwrap();
        assert_eq!(controller.state().await, DictationState::Capturing);
        assert!(gate.is_taken());
    }

    #[tokio::test]
    async fn failed_transcription_returns_to_idle_without_paste() {
        let count = Arc::new(AtomicU64::new(0));
        let paster = MockPaster {
            count: Arc::clone(&count),
            ..Default::default()
        };
        let controller = DictationController::new(
            MockCapture::with_samples(vec![1; 160]),
            MockTranscriber {
                text: String::new(),
                fail: true,
            },
            paster,
            CaptureGate::new(),
            config(),
        );

        controller.hold_down().await.unwrap();
        let result = controller.hold_up().await;
        assert!(matches!(result, Err(DictationError::Transcription(_))));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        // Ready for the next press, no retry of the old buffer
        assert_eq!(controller.state().await, DictationState::Idle);
        controller.hold_down().await.unwrap();
        assert_eq!(controller.state().await, DictationState::Capturing);
    }

    #[tokio::test]
    async fn empty_capture_is_a_failure() {
        let controller = DictationController::new(
            MockCapture::with_samples(vec![]),
            MockTranscriber {
                text: "never".into(),
                fail: false,
            },
            MockPaster::default(),
            CaptureGate::new(),
            config(),
        );

        controller.hold_down().await.unwrap();
        assert!(controller.hold_up().await.is_err());
        assert_eq!(controller.state().await, DictationState::Idle);
    }

    #[tokio::test]
    async fn busy_gate_rejects_press() {
        let gate = CaptureGate::new();
        let _held = gate.acquire().unwrap();
        let controller = DictationController::new(
            MockCapture::with_samples(vec![1; 160]),
            MockTranscriber {
                text: "x".into(),
                fail: false,
            },
            MockPaster::default(),
            gate,
            config(),
        );

        let result = controller.hold_down().await;
        assert!(matches!(
            result,
            Err(DictationError::Device(DeviceError::DeviceBusy))
        ));
        assert_eq!(controller.state().await, DictationState::Idle);
    }

    #[tokio::test]
    async fn gate_released_before_transcription_completes() {
        let gate = CaptureGate::new();
        let controller = DictationController::new(
            MockCapture::with_samples(vec![1; 160]),
            MockTranscriber {
                text: "x".into(),
                fail: false,
            },
            MockPaster::default(),
            gate.clone(),
            config(),
        );

        controller.hold_down().await.unwrap();
        assert!(gate.is_taken());
        controller.hold_up().await.unwrap();
        assert!(!gate.is_taken());
    }
}
