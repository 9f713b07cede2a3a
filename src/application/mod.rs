//! Application layer - Use cases and port interfaces
//!
//! Contains the core business operations and trait definitions
//! for external system interactions.

pub mod dictation;
pub mod ports;
pub mod session;
pub mod transcribe_recording;

// Re-export use cases
pub use dictation::{DictationConfig, DictationController, DictationError};
pub use session::{
    RecordingSession, SessionConfig, SessionError, SessionEvent, SessionObserver,
};
pub use transcribe_recording::{
    list_recordings, TranscribeRecordingError, TranscribeRecordingInput,
    TranscribeRecordingOutput, TranscribeRecordingUseCase, SUPPORTED_EXTENSIONS,
};
