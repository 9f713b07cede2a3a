//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod config;
pub mod device;
pub mod paste;
pub mod sink;
pub mod transcriber;

// Re-export common types
pub use capture::{CapturedAudio, DictationCapture};
pub use config::SettingsStore;
pub use device::{
    BlockHandler, CaptureGate, DeviceError, DeviceStream, GateGuard, StreamHandle, StreamRequest,
};
pub use paste::{PasteError, TextPaster};
pub use sink::{EncoderSink, SinkError, SinkFactory};
pub use transcriber::{Transcriber, TranscriptionError};
