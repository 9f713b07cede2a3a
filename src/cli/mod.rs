//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, and the
//! subcommand runners.

pub mod app;
pub mod args;
pub mod config_cmd;
pub mod presenter;

// Re-export commonly used types
pub use app::{
    load_merged_settings, run_devices, run_dictate, run_record, run_transcribe, EXIT_ERROR,
    EXIT_SUCCESS, EXIT_USAGE_ERROR,
};
pub use args::{Cli, Commands, ConfigAction};
pub use presenter::Presenter;
