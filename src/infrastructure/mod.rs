//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with external systems like cpal, lame, whisper, etc.

pub mod config;
pub mod device;
pub mod encoder;
pub mod paste;
pub mod transcription;

// Re-export adapters
pub use config::XdgSettingsStore;
pub use device::{CpalDeviceStream, CpalMicCapture};
pub use encoder::StdSinkFactory;
pub use paste::ClipboardPaster;
pub use transcription::WhisperCliTranscriber;
