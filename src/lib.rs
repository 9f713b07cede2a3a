//! TalkTally - multi-channel audio recorder with push-to-talk dictation
//!
//! This crate records mic and system audio from a single aggregate input
//! device, routes channels into mic/system/mixed outputs, encodes each to
//! its own file, and drives push-to-talk dictation through an external
//! speech-to-text tool.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Channel routing, state machines, encode settings, naming
//! - **Application**: Use cases and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, hound, flacenc, lame, whisper)
//! - **CLI**: Command-line interface and argument parsing

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
