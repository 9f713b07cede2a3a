//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer has no dependencies on external systems.

pub mod audio;
pub mod config;
pub mod dictation;
pub mod encoding;
pub mod error;
pub mod fs;
pub mod output;
pub mod session;

// Re-export common types
pub use audio::{ChannelMap, ChannelRouter, DeviceDescriptor, InvalidChannelMap, SampleBlock};
pub use config::Settings;
pub use dictation::{DictationMachine, DictationState};
pub use encoding::{EncodeFormat, FlacSettings, FormatUnsupported, Mp3Settings, WavSettings};
pub use error::*;
pub use output::{OutputArtifact, OutputSpec, OutputTarget, RecordingArtifact};
pub use session::{InvalidStateTransition, SessionMachine, SessionState};
